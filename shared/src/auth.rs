use crate::wire::{ByteReader, Uuid, WireError};

/// Size of the authentication response body: status (2) + client uuid (16)
pub const AUTH_RESPONSE_SIZE: usize = 18;

/// Status codes the gateway can answer an authentication request with.
/// Anything other than `Success` fails the connect operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationStatus {
    UnknownError,
    Success,
    AuthenticationFailed,
    SessionNotFound,
    SessionClosed,
    LauncherError,
    ServiceError,
    InvalidRequest,
    DuplicateSession,
    ClientNotFound,
}

impl AuthenticationStatus {
    /// Decodes a status code. Codes outside the known set collapse to
    /// `UnknownError`; the server is free to grow the list and old clients
    /// must still fail the connect with *some* reason.
    pub fn from_wire(code: u16) -> Self {
        match code {
            1 => AuthenticationStatus::Success,
            2 => AuthenticationStatus::AuthenticationFailed,
            3 => AuthenticationStatus::SessionNotFound,
            4 => AuthenticationStatus::SessionClosed,
            5 => AuthenticationStatus::LauncherError,
            6 => AuthenticationStatus::ServiceError,
            7 => AuthenticationStatus::InvalidRequest,
            8 => AuthenticationStatus::DuplicateSession,
            9 => AuthenticationStatus::ClientNotFound,
            _ => AuthenticationStatus::UnknownError,
        }
    }

    pub fn wire_code(&self) -> u16 {
        match self {
            AuthenticationStatus::UnknownError => 0,
            AuthenticationStatus::Success => 1,
            AuthenticationStatus::AuthenticationFailed => 2,
            AuthenticationStatus::SessionNotFound => 3,
            AuthenticationStatus::SessionClosed => 4,
            AuthenticationStatus::LauncherError => 5,
            AuthenticationStatus::ServiceError => 6,
            AuthenticationStatus::InvalidRequest => 7,
            AuthenticationStatus::DuplicateSession => 8,
            AuthenticationStatus::ClientNotFound => 9,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthenticationStatus::Success)
    }
}

/// The first inbound message after connect: `[status:u16][client_uuid:16]`.
/// Read in the dedicated pre-authentication receive mode, before any channel
/// framing applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationResponse {
    pub status: AuthenticationStatus,
    pub client_id: Uuid,
}

impl AuthenticationResponse {
    pub fn de(reader: &mut ByteReader) -> Result<Self, WireError> {
        let status = AuthenticationStatus::from_wire(reader.read_u16()?);
        let client_id = Uuid::de(reader)?;
        Ok(Self { status, client_id })
    }
}
