pub use self::{
    api::{
        AssetView, DashboardAsset, DashboardPayload, DataResponse,
        HistoryResponse, VersionResponse,
    },
    binance::{ExchangeInfo, KlineRow, MarginAsset, MarginMarket, SymbolInfo},
    coin_gecko_market::CoinGeckoMarket,
    telegram::{
        Chat, GetUpdates, Message, SendMessage, TelegramResponse, Update, User,
    },
};

mod api;
mod binance;
mod coin_gecko_market;
mod telegram;
