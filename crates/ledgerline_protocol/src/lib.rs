//! Ledgerline shared protocol.
//!
//! Types every stage of the pipeline agrees on:
//!
//! - [`table`]: parsed segment tables (`ParsedTable`, `Column`, `Scalar`)
//! - [`error`]: the cross-crate failure taxonomy (`TransformError`)
//! - [`response`]: the invocation event and the four response shapes
//! - [`services`]: narrow interfaces to external collaborators
//!   (object storage, secrets, hashing, relational store, broker)
//! - [`defaults`]: canonical default values

pub mod defaults;
pub mod error;
pub mod response;
pub mod services;
pub mod table;

pub use error::{
    ConstraintFailure, ErrorKind, ServiceError, TransformError, TransformResult, ValidationFailure,
};
pub use response::{
    ConstraintErrorResponse, ConstraintOutcome, ExecutorResponse, GenericErrorResponse,
    InvocationEvent, OutcomeStatus, ProducerReceipt, ResponseEnvelope, RuleOrigin, RuleOutcome,
    SuccessResultResponse, ValidationErrorResponse,
};
pub use services::{
    Broker, BrokerConfig, BrokerSession, Collaborators, ConnectionInfo, Credentials, HashFunction,
    HashRequest, HashResponse, ObjectStore, QueryResult, RelationalStore, SecretStore, ServiceResult,
};
pub use table::{Column, ParsedTable, Record, Scalar, TableError, TableSet};
