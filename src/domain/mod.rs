/// Domain model
///
/// Users, roles, issued tokens and activation hashes. Tokens and hashes
/// point at their owner by id; users hold no collections of either.

mod activation_hash;
mod role;
mod token;
mod user;

pub use activation_hash::{generate_activation_hash, ActivationHash, ACTIVATION_HASH_TTL_HOURS};
pub use role::{authorities, Permission, Role};
pub use token::{IssuedToken, TokenType};
pub use user::{NewUser, User, UserDto, UserStatus};
