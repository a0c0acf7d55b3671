pub mod extractors;
pub mod token;

pub use extractors::BearerAuth;
pub use token::generate_token;
