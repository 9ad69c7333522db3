//! Domain services for the forms builder.
//!
//! Services contain business logic that operates on domain models.

pub mod access_control;
pub mod aggregation;
pub mod mail;
pub mod submission;

pub use access_control::{authorize, can_perform, is_permitted, AccessError};

pub use aggregation::{
    aggregate, summarize, ChoiceBucket, FieldSummary, ResponsesSummary, SummaryData,
};

pub use mail::{
    build_submission_mails, dispatch_all, MailAttachment, MailContext, MailDispatcher, MailError,
    MailMessage, MailSettings, MockMailDispatcher,
};

pub use submission::{
    clean_submission, submitter_email, submitter_for, CleanedValue, FieldError, SubmissionError,
    SubmissionRules,
};
