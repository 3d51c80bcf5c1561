use std::path::PathBuf;

use clap::Parser;

use crate::{db::Db, prelude::*};

#[derive(Parser)]
pub struct DbArgs {
    #[clap(long = "database-path", env = "DATABASE_PATH", default_value = "ev-steer.sqlite3")]
    path: PathBuf,
}

impl DbArgs {
    pub fn open(&self) -> Result<Db> {
        Db::open(&self.path)
    }
}
