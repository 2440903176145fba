pub use self::{
    database::DatabasePool,
    http::HTTP,
    snapshot_file::SnapshotFile,
    subscribers::SubscriberStore,
    telegram::{MessageSender, Telegram},
};

mod database;
mod http;
mod snapshot_file;
mod subscribers;
mod telegram;
