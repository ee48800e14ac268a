pub mod commit;
pub mod event;
pub mod profile;
pub mod report;
pub mod repo;

pub use commit::{CommitRecord, FailureRecord, NameEmailPair};
pub use event::EventSummary;
pub use profile::ProfileRecord;
pub use report::{
    CategorizedEmails, DateInversionFlag, EmailsForName, IdentityRotation, MatchRecord,
    NamesForEmail, Report, RepoCommits, RepoContributors, RepoPullRequests,
};
pub use repo::RepoDescriptor;
