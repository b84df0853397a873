use std::io::{self, Read};
use std::time::{Duration, Instant};

/// Longest line accepted from a server before the reply is rejected.
const MAX_LINE_LEN: usize = 8 * 1024;
/// Upper bound on continuation lines in one reply.
const MAX_REPLY_LINES: usize = 512;

/// One logical SMTP reply, possibly assembled from several lines.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    /// Status code of the first line, `None` if it did not start with three
    /// digits.
    pub code: Option<u16>,
    /// Raw lines, code prefix included, without line terminators.
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        self.code.is_some_and(|code| (200..300).contains(&code))
    }

    /// Case-insensitive substring match over the whole reply.
    pub fn has_capability(&self, cap: &str) -> bool {
        let needle = cap.to_ascii_uppercase();
        self.lines
            .iter()
            .any(|line| line.to_ascii_uppercase().contains(&needle))
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A byte source whose blocking reads can be bounded.
pub trait TimedRead: Read {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

/// Re-arms the read timeout before every read so that all reads together
/// finish by `deadline`.
struct Deadline<'a, R> {
    inner: &'a mut R,
    deadline: Instant,
}

impl<R: TimedRead> Read for Deadline<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self
            .deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "reply deadline exceeded"))?;
        self.inner.set_read_timeout(Some(remaining))?;
        self.inner.read(buf)
    }
}

/// Splits a byte stream into SMTP replies.
///
/// A line whose fourth character is `-` announces another line of the same
/// reply. The reader keeps whatever it over-read for the next call, so it
/// must be [`reset`](Self::reset) whenever the underlying transport changes.
#[derive(Debug, Default)]
pub struct ReplyReader {
    buffer: Vec<u8>,
}

impl ReplyReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Like [`read_reply`](Self::read_reply), but fails with
    /// [`io::ErrorKind::TimedOut`] unless the whole reply, continuation lines
    /// included, has arrived by `deadline`.
    pub fn read_reply_until<R: TimedRead>(
        &mut self,
        source: &mut R,
        deadline: Instant,
    ) -> io::Result<SmtpReply> {
        self.read_reply(&mut Deadline {
            inner: source,
            deadline,
        })
    }

    pub fn read_reply<R: Read>(&mut self, source: &mut R) -> io::Result<SmtpReply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line(source)?;
            let is_last = line.as_bytes().get(3) != Some(&b'-');
            lines.push(line);
            if is_last {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "reply has too many continuation lines",
                ));
            }
        }
        let code = parse_code(&lines[0]);
        Ok(SmtpReply { code, lines })
    }

    fn read_line<R: Read>(&mut self, source: &mut R) -> io::Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if self.buffer.len() > MAX_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "reply line exceeds maximum length",
                ));
            }

            let mut buf = [0u8; 512];
            let read = source.read(&mut buf)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

fn parse_code(line: &str) -> Option<u16> {
    let prefix = line.get(..3)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let separator = line.as_bytes().get(3);
    if !matches!(separator, None | Some(b' ') | Some(b'-')) {
        return None;
    }
    prefix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &str) -> Vec<SmtpReply> {
        let mut source = Cursor::new(input.as_bytes().to_vec());
        let mut reader = ReplyReader::new();
        let mut replies = Vec::new();
        while let Ok(reply) = reader.read_reply(&mut source) {
            replies.push(reply);
        }
        replies
    }

    #[test]
    fn single_line() {
        let replies = read_all("220 mx.example.com ESMTP ready\r\n");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].code, Some(220));
        assert_eq!(replies[0].text(), "220 mx.example.com ESMTP ready");
    }

    #[test]
    fn multiline_reply_is_one_unit() {
        let replies = read_all(
            "250-mx.example.com Hello\r\n250-SIZE 35882577\r\n250-STARTTLS\r\n250 SMTPUTF8\r\n",
        );
        assert_eq!(replies.len(), 1);
        let ehlo = &replies[0];
        assert_eq!(ehlo.code, Some(250));
        assert_eq!(ehlo.lines.len(), 4);
        assert!(ehlo.has_capability("starttls"));
        assert!(!ehlo.has_capability("CHUNKING"));
    }

    #[test]
    fn consecutive_replies_in_one_buffer() {
        let replies = read_all("250 2.1.0 Ok\r\n550 5.1.1 User unknown\r\n");
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].code, Some(550));
        assert!(!replies[1].is_positive_completion());
    }

    #[test]
    fn bare_lf_terminators_are_tolerated() {
        let replies = read_all("220 hi\n");
        assert_eq!(replies[0].lines, vec!["220 hi".to_string()]);
    }

    #[test]
    fn malformed_code_is_none() {
        let replies = read_all("hello there\r\n2x0 nope\r\n25\r\n2500 joined\r\n");
        assert_eq!(replies.len(), 4);
        assert!(replies.iter().all(|r| r.code.is_none()));
    }

    #[test]
    fn code_only_line() {
        let replies = read_all("250\r\n");
        assert_eq!(replies[0].code, Some(250));
    }

    #[test]
    fn truncated_reply_is_eof() {
        let mut source = Cursor::new(b"250-first\r\n250 sec".to_vec());
        let err = ReplyReader::new()
            .read_reply(&mut source)
            .expect_err("incomplete reply");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    /// Sends one continuation line per read, each after `delay`.
    struct Drip {
        delay: Duration,
        timeouts: Vec<Duration>,
    }

    impl Read for Drip {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(self.delay);
            let line = b"220-still here\r\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    impl TimedRead for Drip {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.extend(timeout);
            Ok(())
        }
    }

    #[test]
    fn slow_continuation_lines_hit_the_reply_deadline() {
        let mut source = Drip {
            delay: Duration::from_millis(30),
            timeouts: Vec::new(),
        };
        let bound = Duration::from_millis(150);
        let started = Instant::now();

        let err = ReplyReader::new()
            .read_reply_until(&mut source, started + bound)
            .expect_err("never-ending reply");

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(started.elapsed() < bound * 3, "took {:?}", started.elapsed());
        assert!(source.timeouts.len() > 1);
        assert!(source.timeouts.iter().all(|t| *t <= bound));
        assert!(source.timeouts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn reply_within_deadline_is_read() {
        let mut source = Cursor::new(b"250 ok\r\n".to_vec());
        let reply = ReplyReader::new()
            .read_reply_until(&mut source, Instant::now() + Duration::from_secs(5))
            .expect("reply");
        assert_eq!(reply.code, Some(250));
    }

    impl TimedRead for Cursor<Vec<u8>> {
        fn set_read_timeout(&mut self, _: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn overlong_line_is_rejected() {
        let mut source = Cursor::new(vec![b'a'; MAX_LINE_LEN + 1024]);
        let err = ReplyReader::new()
            .read_reply(&mut source)
            .expect_err("line too long");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
