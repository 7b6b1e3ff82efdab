//! Authenticated session management for the jobhound crawler.
//!
//! [`SessionManager::establish`] restores stored cookies, opens the login
//! page and polls a bounded number of times for the logged-in marker. In
//! unattended mode it reveals the login QR code and hands it to a
//! [`QrCodeSink`]. Cookies are persisted by [`CredentialStore`] right after a
//! successful login.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod credential;
pub mod error;
pub mod manager;
pub mod qrcode;

pub use credential::{CredentialStore, SessionCredential};
pub use error::{Result, SessionError};
pub use manager::{login_url, LoginState, SessionManager};
pub use qrcode::{LogQrSink, QrCodeSink};
