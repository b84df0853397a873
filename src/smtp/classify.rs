//! Reply classification.
//!
//! Wording rules run before numeric rules: providers reuse 550 for several
//! unrelated refusals and only the text tells them apart.

use super::types::{DiagnosticTag, RecipientStatus};

type Verdict = (RecipientStatus, DiagnosticTag);

struct TextRule {
    applies: fn(u16, &str) -> bool,
    verdict: fn(u16) -> Verdict,
}

const BLACKLIST_WORDS: [&str; 3] = ["blocked", "spamhaus", "blacklist"];

const TEXT_RULES: &[TextRule] = &[
    TextRule {
        applies: |code, text| {
            (550..=559).contains(&code) && BLACKLIST_WORDS.iter().any(|w| text.contains(w))
        },
        verdict: |_| (RecipientStatus::Blacklisted, DiagnosticTag::BlockedByBlacklist),
    },
    TextRule {
        applies: |_, text| text.contains("relay access denied"),
        verdict: |_| (RecipientStatus::UnknownFailure, DiagnosticTag::RelayDenied),
    },
    TextRule {
        applies: |_, text| text.contains("not permitted"),
        verdict: |_| (RecipientStatus::UnknownFailure, DiagnosticTag::AccessDenied),
    },
    TextRule {
        applies: |_, text| text.contains("greylist"),
        verdict: |code| (RecipientStatus::from_code_class(code), DiagnosticTag::Greylisted),
    },
    TextRule {
        applies: |_, text| text.contains("syntax"),
        verdict: |code| (RecipientStatus::from_code_class(code), DiagnosticTag::SyntaxError),
    },
    TextRule {
        applies: |_, text| text.contains("user not found"),
        verdict: |_| (RecipientStatus::UserNotFound, DiagnosticTag::MailboxNotFound),
    },
    TextRule {
        applies: |_, text| text.contains("recipient address rejected"),
        verdict: |_| (RecipientStatus::UserNotFound, DiagnosticTag::MailboxNameInvalid),
    },
];

/// Maps a reply code and its text to a status and diagnostic tag.
///
/// `code` is `None` when no decisive reply was parsed.
pub fn classify(code: Option<u16>, reply_text: &str) -> (RecipientStatus, DiagnosticTag) {
    let Some(code) = code else {
        return (RecipientStatus::UnknownFailure, DiagnosticTag::Unclassified);
    };
    let text = reply_text.to_lowercase();

    TEXT_RULES
        .iter()
        .find(|rule| (rule.applies)(code, &text))
        .map(|rule| (rule.verdict)(code))
        .unwrap_or_else(|| classify_code(code))
}

fn classify_code(code: u16) -> Verdict {
    use DiagnosticTag as Tag;
    use RecipientStatus as Status;

    match code {
        250 => (Status::Valid, Tag::Accepted),
        251 => (Status::Valid, Tag::Forwarded),
        252 => (Status::Valid, Tag::CannotVerify),
        253..=259 => (Status::Valid, Tag::Accepted),
        421 => (Status::TemporaryFailure, Tag::ServiceUnavailable),
        450 => (Status::TemporaryFailure, Tag::MailboxBusy),
        451 => (Status::TemporaryFailure, Tag::LocalError),
        452 => (Status::TemporaryFailure, Tag::InsufficientStorage),
        400..=499 => (Status::TemporaryFailure, Tag::Unclassified),
        550 => (Status::UserNotFound, Tag::MailboxNotFound),
        551 => (Status::UserNotFound, Tag::UserNotLocal),
        552 => (Status::UnknownFailure, Tag::StorageExceeded),
        553 => (Status::UserNotFound, Tag::MailboxNameInvalid),
        554 => (Status::UnknownFailure, Tag::TransactionFailed),
        _ => (Status::UnknownFailure, Tag::Unclassified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DiagnosticTag as Tag;
    use RecipientStatus as Status;

    #[test]
    fn reference_replies() {
        assert_eq!(
            classify(Some(250), "250 2.1.5 OK"),
            (Status::Valid, Tag::Accepted)
        );
        assert_eq!(
            classify(Some(550), "550 5.1.1 User unknown"),
            (Status::UserNotFound, Tag::MailboxNotFound)
        );
        assert_eq!(
            classify(Some(452), "452 4.2.2 mailbox full"),
            (Status::TemporaryFailure, Tag::InsufficientStorage)
        );
    }

    #[test]
    fn positive_completions() {
        assert_eq!(classify(Some(251), "251 forwarding"), (Status::Valid, Tag::Forwarded));
        assert_eq!(
            classify(Some(252), "252 cannot VRFY user"),
            (Status::Valid, Tag::CannotVerify)
        );
        assert_eq!(classify(Some(253), "253 ok"), (Status::Valid, Tag::Accepted));
    }

    #[test]
    fn transient_codes() {
        assert_eq!(
            classify(Some(421), "421 closing"),
            (Status::TemporaryFailure, Tag::ServiceUnavailable)
        );
        assert_eq!(
            classify(Some(450), "450 mailbox unavailable"),
            (Status::TemporaryFailure, Tag::MailboxBusy)
        );
        assert_eq!(
            classify(Some(451), "451 local error"),
            (Status::TemporaryFailure, Tag::LocalError)
        );
        assert_eq!(
            classify(Some(447), "447 try later"),
            (Status::TemporaryFailure, Tag::Unclassified)
        );
    }

    #[test]
    fn permanent_codes() {
        assert_eq!(
            classify(Some(551), "551 not local"),
            (Status::UserNotFound, Tag::UserNotLocal)
        );
        assert_eq!(
            classify(Some(552), "552 exceeded"),
            (Status::UnknownFailure, Tag::StorageExceeded)
        );
        assert_eq!(
            classify(Some(553), "553 bad name"),
            (Status::UserNotFound, Tag::MailboxNameInvalid)
        );
        assert_eq!(
            classify(Some(554), "554 failed"),
            (Status::UnknownFailure, Tag::TransactionFailed)
        );
        assert_eq!(
            classify(Some(530), "530 auth required"),
            (Status::UnknownFailure, Tag::Unclassified)
        );
    }

    #[test]
    fn wording_beats_code() {
        assert_eq!(
            classify(Some(550), "550 5.7.1 Relay access denied"),
            (Status::UnknownFailure, Tag::RelayDenied)
        );
        assert_eq!(
            classify(Some(550), "550 5.7.1 Client host blocked using Spamhaus"),
            (Status::Blacklisted, Tag::BlockedByBlacklist)
        );
        assert_eq!(
            classify(Some(554), "554 Your IP is on our BLACKLIST"),
            (Status::Blacklisted, Tag::BlockedByBlacklist)
        );
        assert_eq!(
            classify(Some(550), "550 Sender not permitted"),
            (Status::UnknownFailure, Tag::AccessDenied)
        );
        assert_eq!(
            classify(Some(501), "501 5.5.4 Syntax error in parameters"),
            (Status::UnknownFailure, Tag::SyntaxError)
        );
    }

    #[test]
    fn blacklist_words_need_a_55x_code() {
        assert_eq!(
            classify(Some(451), "451 temporarily blocked"),
            (Status::TemporaryFailure, Tag::LocalError)
        );
    }

    #[test]
    fn greylisting_keeps_transient_status() {
        assert_eq!(
            classify(
                Some(450),
                "450 4.2.0 <a@b.com>: Recipient address rejected: Greylisted, see http://postgrey"
            ),
            (Status::TemporaryFailure, Tag::Greylisted)
        );
    }

    #[test]
    fn text_only_mailbox_rules() {
        assert_eq!(
            classify(Some(511), "511 user not found"),
            (Status::UserNotFound, Tag::MailboxNotFound)
        );
        assert_eq!(
            classify(
                Some(550),
                "550 5.1.1 <x@y.com>: Recipient address rejected: User unknown"
            ),
            (Status::UserNotFound, Tag::MailboxNameInvalid)
        );
    }

    #[test]
    fn missing_code_is_unclassified() {
        assert_eq!(
            classify(None, "garbage"),
            (Status::UnknownFailure, Tag::Unclassified)
        );
    }
}
