//! User-facing message strings returned in response bodies.

pub const WELCOME_MESSAGE: &str = "Hello! It is a PhotoShake App";
pub const DB_CONFIG_ERROR: &str = "Database is not configured correctly";
pub const DB_CONNECT_ERROR: &str = "Error connecting to the database";

pub const NOT_FOUND: &str = "Not Found";
pub const ALREADY_EXISTS: &str = "Account already exists";
pub const SUCCESS_CREATE_USER: &str = "User successfully created. Check your email for confirmation.";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const INVALID_TOKEN: &str = "Invalid refresh token";
pub const VERIFICATION_ERROR: &str = "Verification error";
pub const INVALID_EMAIL: &str = "Invalid email";
pub const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";
pub const EMAIL_ALREADY_CONFIRMED: &str = "Your email is already confirmed";
pub const EMAIL_CONFIRMED: &str = "Email successfully confirmed";
pub const CHECK_YOUR_EMAIL: &str = "Check your email for confirmation.";
pub const FAIL_EMAIL_VERIFICATION: &str = "Invalid token for email verification";
pub const INVALID_SCOPE: &str = "Invalid scope for token";
pub const NOT_VALIDATE_CREDENTIALS: &str = "Could not validate credentials";

pub const TOO_MANY_REQUESTS: &str = "No more than 10 requests per minute";
pub const USER_NOT_ACTIVE: &str = "User is banned";
pub const USER_ALREADY_NOT_ACTIVE: &str = "User already is banned";
pub const USER_ROLE_EXISTS: &str = "Role is already exists";
pub const USER_CHANGE_ROLE_TO: &str = "User role changed to";
pub const USER_IS_LOGOUT: &str = "Successfully logged out!";
pub const TOO_MANY_TAGS: &str = "Too many tags! Maximum 5.";
pub const NO_FOTO_ID: &str = "No foto with this ID.";
pub const COMM_NOT_FOUND: &str = "Comment not found or not available.";
pub const NO_RATING: &str = "Rating not found or not available.";
pub const OWN_FOTO: &str = "It`s not possible vote for own foto.";
pub const VOTE_TWICE: &str = "It`s not possible to vote twice.";
pub const OPERATION_FORBIDDEN: &str = "Operation forbidden";
pub const TAG_ALREADY_EXISTS: &str = "Tag with this title already exists";
