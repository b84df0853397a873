use std::fmt;

use chrono::Utc;
use native_tls::TlsConnector;

use super::error::ProbeError;
use super::options::ProbeOptions;
use super::reply::SmtpReply;
use super::stream::SmtpStream;
use super::types::ValidationResult;

/// Steps of a probe, in the order they run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Banner,
    Ehlo,
    StartTls,
    TlsHandshake,
    ReEhlo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Banner => "banner",
            Self::Ehlo => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::TlsHandshake => "TLS handshake",
            Self::ReEhlo => "EHLO after STARTTLS",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        })
    }
}

#[derive(Debug, Default)]
struct Transcript {
    entries: Vec<String>,
}

impl Transcript {
    fn sent(&mut self, command: &str) {
        self.entries.push(format!(">> {command}"));
    }

    fn received(&mut self, reply: &SmtpReply) {
        self.entries.push(format!("<< {}", reply.text()));
    }

    fn note(&mut self, note: &str) {
        self.entries.push(format!("-- {note}"));
    }

    fn render(&self) -> String {
        self.entries.join("\n").trim().to_string()
    }
}

/// One partial SMTP transaction against one mail exchanger.
///
/// The session never sends `DATA`: it stops after the `RCPT TO` reply, says
/// `QUIT` and drops the socket.
pub struct SmtpSession<'a> {
    host: &'a str,
    options: &'a ProbeOptions,
    connector: &'a TlsConnector,
    transcript: Transcript,
}

impl<'a> SmtpSession<'a> {
    pub fn new(host: &'a str, options: &'a ProbeOptions, connector: &'a TlsConnector) -> Self {
        Self {
            host,
            options,
            connector,
            transcript: Transcript::default(),
        }
    }

    /// Runs the session up to `RCPT TO:<recipient>` and classifies the reply.
    /// Failures are folded into the result; the transcript always covers
    /// everything exchanged before the session ended.
    pub fn probe(mut self, recipient: &str) -> ValidationResult {
        let started = Utc::now();
        match self.run(recipient) {
            Ok(reply) => {
                let result = ValidationResult::from_smtp_reply(
                    self.host,
                    &reply,
                    self.transcript.render(),
                    started,
                );
                tracing::debug!(
                    host = self.host,
                    recipient,
                    code = result.smtp_code(),
                    tag = %result.diagnostic_tag(),
                    "probe finished"
                );
                result
            }
            Err(err) => {
                tracing::warn!(host = self.host, recipient, error = %err, "probe aborted");
                ValidationResult::from_failure(self.host, &err, self.transcript.render(), started)
            }
        }
    }

    fn run(&mut self, recipient: &str) -> Result<SmtpReply, ProbeError> {
        let mut stream = SmtpStream::connect(self.host, self.options.port, self.options.timeout())?;

        // servers with odd banners still get probed
        self.read(&mut stream, Stage::Banner)?;

        let ehlo_cmd = format!("EHLO {}", self.options.helo_name(self.host));
        let ehlo = self.command(&mut stream, Stage::Ehlo, &ehlo_cmd)?;
        require_positive(Stage::Ehlo, &ehlo)?;

        let advertised = ehlo.has_capability("STARTTLS");
        if advertised && self.options.starttls {
            let reply = self.command(&mut stream, Stage::StartTls, "STARTTLS")?;
            if reply.is_positive_completion() {
                stream.upgrade_tls(self.host, self.connector)?;
                self.transcript.note("TLS established");
                let ehlo = self.command(&mut stream, Stage::ReEhlo, &ehlo_cmd)?;
                require_positive(Stage::ReEhlo, &ehlo)?;
            } else {
                self.transcript
                    .note("STARTTLS refused by server, continuing without TLS");
            }
        } else if advertised {
            self.transcript.note("STARTTLS disabled, continuing without TLS");
        } else {
            self.transcript
                .note("STARTTLS not advertised, continuing without TLS");
        }

        let mail_cmd = format!("MAIL FROM:<{}>", self.options.mail_from(self.host));
        let mail = self.command(&mut stream, Stage::MailFrom, &mail_cmd)?;
        require_positive(Stage::MailFrom, &mail)?;

        let rcpt_cmd = format!("RCPT TO:<{recipient}>");
        let rcpt = self.command(&mut stream, Stage::RcptTo, &rcpt_cmd)?;

        self.quit(&mut stream);
        Ok(rcpt)
    }

    fn command(
        &mut self,
        stream: &mut SmtpStream,
        stage: Stage,
        command: &str,
    ) -> Result<SmtpReply, ProbeError> {
        if command.contains(['\r', '\n']) {
            return Err(ProbeError::InvalidCommand(command.to_string()));
        }
        self.transcript.sent(command);
        tracing::debug!(host = self.host, %stage, ">> {command}");
        stream
            .send_line(command)
            .map_err(|err| ProbeError::io(stage, err))?;
        self.read(stream, stage)
    }

    fn read(&mut self, stream: &mut SmtpStream, stage: Stage) -> Result<SmtpReply, ProbeError> {
        let reply = stream
            .read_reply()
            .map_err(|err| ProbeError::io(stage, err))?;
        tracing::debug!(host = self.host, %stage, "<< {}", reply.text());
        self.transcript.received(&reply);
        Ok(reply)
    }

    fn quit(&mut self, stream: &mut SmtpStream) {
        if let Err(err) = self.command(stream, Stage::Quit, "QUIT") {
            tracing::debug!(host = self.host, error = %err, "QUIT failed");
        }
    }
}

fn require_positive(stage: Stage, reply: &SmtpReply) -> Result<(), ProbeError> {
    if reply.is_positive_completion() {
        Ok(())
    } else {
        Err(ProbeError::Rejected {
            stage,
            code: reply.code,
            reply: reply.text(),
        })
    }
}
