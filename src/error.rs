use std::error::Error as StdError;
use std::fmt;

use crate::call::OperationKind;

// Form validation

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    EmptyField,
    NotPositive,
    OutOfRange,
    InvalidAddress,
    MalformedNumber,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::EmptyField => write!(f, "is required"),
            FieldErrorKind::NotPositive => write!(f, "must be greater than zero"),
            FieldErrorKind::OutOfRange => write!(f, "is out of range"),
            FieldErrorKind::InvalidAddress => write!(f, "is not a valid account address"),
            FieldErrorKind::MalformedNumber => write!(f, "is not a number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.kind)
    }
}

/// Every field error found in one form, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, kind: FieldErrorKind) {
        self.0.push(FieldError { field, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str, kind: FieldErrorKind) -> bool {
        self.0.iter().any(|e| e.field == field && e.kind == kind)
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldErrorKind> {
        self.0.iter().find(|e| e.field == field).map(|e| e.kind)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "Invalid form: {}", parts.join(", "))
    }
}

impl StdError for ValidationErrors {}

// Amount conversion

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    MalformedNumber(String),
    Overflow,
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::MalformedNumber(input) => write!(f, "Malformed number: {:?}", input),
            AmountError::Overflow => write!(f, "Amount exceeds the 256-bit integer range"),
        }
    }
}

impl StdError for AmountError {}

// Call construction

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    MissingRequiredField(&'static str),
    Amount(AmountError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingRequiredField(field) => write!(f, "Missing required field: {}", field),
            BuildError::Amount(e) => write!(f, "Conversion error: {}", e),
        }
    }
}

impl StdError for BuildError {}

impl From<AmountError> for BuildError {
    fn from(e: AmountError) -> Self {
        BuildError::Amount(e)
    }
}

/// Raised when a raw form cannot be turned into a call descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    Invalid(ValidationErrors),
    Build(BuildError),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepareError::Invalid(e) => write!(f, "{}", e),
            PrepareError::Build(e) => write!(f, "{}", e),
        }
    }
}

impl StdError for PrepareError {}

// Transaction lifecycle

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    NotConnected,
    AlreadyInFlight(OperationKind),
    SubmissionRejected(String),
    InvalidReset(OperationKind),
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorError::NotConnected => write!(f, "Wallet is not connected"),
            CoordinatorError::AlreadyInFlight(kind) => write!(f, "A {} transaction is already in flight", kind),
            CoordinatorError::SubmissionRejected(msg) => write!(f, "Submission rejected: {}", msg),
            CoordinatorError::InvalidReset(kind) => write!(f, "Cannot reset {} while a transaction is in flight", kind),
        }
    }
}

impl StdError for CoordinatorError {}

// Wallet / node providers

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    UserRejected,
    Network(String),
    Parse(String),
    Api(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::UserRejected => write!(f, "User rejected the request"),
            ProviderError::Network(msg) => write!(f, "Network error: {}", msg),
            ProviderError::Parse(msg) => write!(f, "Parsing error: {}", msg),
            ProviderError::Api(msg) => write!(f, "API error: {}", msg),
        }
    }
}

impl StdError for ProviderError {}

// Keychain session

#[derive(Debug)]
pub enum SessionError {
    NotFound,
    Access(String),
    InvalidMnemonic(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "Wallet not found in keychain"),
            SessionError::Access(msg) => write!(f, "Keychain access error: {}", msg),
            SessionError::InvalidMnemonic(msg) => write!(f, "Invalid mnemonic: {}", msg),
        }
    }
}

impl StdError for SessionError {}

// Settings

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Settings file error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Settings parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid settings: {}", msg),
        }
    }
}

impl StdError for ConfigError {}
