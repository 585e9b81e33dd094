pub mod gate;
pub mod guard;
pub mod password;
pub mod principal;
pub mod token;

pub use gate::{AuthGate, CurrentPrincipal};
pub use guard::Guard;
pub use principal::{Principal, PrincipalLookup, UserLookup};
pub use token::{Claims, TokenKind, TokenPair, TokenService};
