/// Email authentication record checks (DMARC, DKIM)
///
/// Each checker resolves one TXT name, parses it with the shared
/// `tag=value` grammar and validates it. Every outcome, including DNS
/// failures, comes back as a [`RecordCheckResult`].

pub mod dkim;
pub mod dmarc;
pub mod parser;
pub mod suggestion;
pub mod types;

pub use dkim::{DkimChecker, DkimKeyRecord, DkimKeyType};
pub use dmarc::{DmarcAlignment, DmarcChecker, DmarcPolicy, DmarcPolicyRecord};
pub use parser::{parse_record, parse_tags, ParseError, TagList, VersionTag};
pub use suggestion::{suggest, SuggestionContext};
pub use types::{DomainAuthReport, FailureKind, RecordCheckResult, RecordKind};
