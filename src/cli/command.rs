use clap::Subcommand;

use crate::cli::user_cmd::UserCmd;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "User administration commands",
        long_about = "Bootstrap administrator accounts and set passwords directly in the database, without going through the API."
    )]
    User {
        #[command(subcommand)]
        cmd: UserCmd,
    },
}
