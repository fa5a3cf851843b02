use crate::cli::Command;
use crate::context;
use crate::storage::Storage;

pub mod user;

pub trait CommandRunner {
    fn run<S: Storage>(&self, ctx: &context::Context, storage: &S) -> anyhow::Result<()>;
}

impl Command {
    pub fn run<S: Storage>(&self, ctx: &context::Context, storage: &S) -> anyhow::Result<()> {
        match self {
            Command::User { cmd } => cmd.run(ctx, storage),
        }
    }
}
