pub mod bot;
pub mod daily_report;
pub mod refresh;
