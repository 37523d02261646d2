//! Identity token wire format shared with the security provider.

mod token;

pub use token::{JwtClaims, JwtToken, TokenError, AUDIENCE, EXPIRES, ISSUER, PRINCIPAL};
