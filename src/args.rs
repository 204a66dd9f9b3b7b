use std::{fmt, path::PathBuf};

use clap::Parser;

#[derive(Clone, Parser)]
pub struct AcademyArgs {
    /// Address to bind the HTTP listener to
    #[clap(long, env = "ACADEMY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port
    #[clap(long, env = "ACADEMY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// SQLite database URL
    #[clap(long, env = "ACADEMY_DATABASE_URL", default_value = "sqlite:academy.db")]
    pub database_url: String,

    /// Directory lesson uploads are stored in
    #[clap(short, long, env = "ACADEMY_MEDIA", default_value = "media")]
    pub media: PathBuf,

    /// Only send the session cookie over HTTPS
    #[clap(long, env = "ACADEMY_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Allow anyone to create a manager account at /register
    #[clap(long, env = "ACADEMY_ALLOW_REGISTRATION")]
    pub allow_registration: bool,

    /// Username of the manager created when the database has no users
    #[clap(long, env = "ACADEMY_ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Password of the bootstrap manager
    #[clap(long, env = "ACADEMY_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// PBKDF2 rounds used for new password hashes
    #[clap(long, env = "ACADEMY_PASSWORD_ITERATIONS", default_value_t = 600_000)]
    pub password_iterations: u32,
}

impl fmt::Debug for AcademyArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcademyArgs")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("media", &self.media)
            .field("secure_cookies", &self.secure_cookies)
            .field("allow_registration", &self.allow_registration)
            .field("admin_username", &self.admin_username)
            .field("password_iterations", &self.password_iterations)
            .finish_non_exhaustive()
    }
}
