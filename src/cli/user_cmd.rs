use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum UserCmd {
    #[command(
        about = "Create an administrator account",
        long_about = "Create a user carrying ROLE_ADMIN. When --password is omitted the password is prompted for on the terminal."
    )]
    CreateAdmin {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long = "first-name", value_name = "NAME")]
        first_name: String,
        #[arg(long = "last-name", value_name = "NAME")]
        last_name: String,
        #[arg(
            long,
            value_name = "PASSWORD",
            env = "TRACKER_ADMIN_PASSWORD",
            hide_env_values = true,
            help = "Password for the new account (prompted when omitted)"
        )]
        password: Option<String>,
    },
    #[command(
        about = "Set a user's password",
        long_about = "Replace the password of an existing user and invalidate any pending reset token."
    )]
    SetPassword {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(
            long,
            value_name = "PASSWORD",
            help = "New password (prompted when omitted)"
        )]
        password: Option<String>,
    },
}
