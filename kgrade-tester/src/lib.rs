//! Grades a Kafka broker: sends requests, decodes the responses field by field and
//! checks them against what the generated log directory says the broker should know.

pub mod asserter;
pub mod assertions;
pub mod error;
pub mod stages;


pub use asserter::{assert_message_length, ResponseAsserter, ResponseAssertion};
pub use error::{AssertionError, Result, TesterError};
pub use stages::{find, Stage, StageContext, STAGES};
