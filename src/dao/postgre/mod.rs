pub use self::{
    path::get_path,
    types::{DataBase, PoolOption, PoolType},
};

mod asset_history;
mod path;
mod types;
