//! Server-rendered pages. Markup is built from escaped strings; the chart
//! is drawn client-side by `static/app.js` from an embedded JSON block.

use actix_web::{get, http::header::ContentType, web, HttpResponse};
use serde::Serialize;

use super::api::{daily_rankings, HistoryQuery};
use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{escape_html, format_large_number, format_utc},
    model::AssetRecord,
    pipeline::{history::clamp_days, history::DailyRanking, Snapshot},
};

#[get("/")]
async fn index(state: web::Data<AppState<State>>) -> Result<HttpResponse, Error> {
    let snapshot = state.web.run().await?;
    let body = render_index(&snapshot, state.config.ratio_threshold)?;

    Ok(html(body))
}

#[get("/history")]
async fn history(
    state: web::Data<AppState<State>>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, Error> {
    let days = clamp_days(query.days, state.config.history_max_days);
    let rankings = daily_rankings(&state, days).await?;
    let body = render_history(&rankings, days, state.database.is_some());

    Ok(html(body))
}

#[get("/about")]
async fn about(state: web::Data<AppState<State>>) -> Result<HttpResponse, Error> {
    Ok(html(render_about(&state.config.sources, state.config.ratio_threshold)))
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(body)
}

#[derive(Debug, Serialize)]
struct ChartData<'a> {
    labels: Vec<&'a str>,
    ratios: Vec<f64>,
}

pub fn render_index(snapshot: &Snapshot, threshold: f64) -> Result<String, Error> {
    let chart = ChartData {
        labels: snapshot.data.iter().map(|r| r.symbol.as_str()).collect(),
        ratios: snapshot.data.iter().map(|r| r.ratio).collect(),
    };
    // `</` would close the script element early
    let chart = serde_json::to_string(&chart)?.replace("</", "<\\/");

    let mut body = format!(
        "<h1>Borrow/Repay ratio above {}</h1>\n<p class=\"meta\">Updated {}</p>\n",
        threshold,
        escape_html(&format_utc(&snapshot.timestamp))
    );

    if snapshot.is_sample() {
        body.push_str(
            "<p class=\"warning\">Live sources are unavailable, showing sample data.</p>\n",
        );
    }

    body.push_str("<canvas id=\"ratio-chart\" height=\"120\"></canvas>\n");
    body.push_str(&format!(
        "<script type=\"application/json\" id=\"chart-data\">{}</script>\n",
        chart
    ));
    body.push_str(&records_table(&snapshot.data));

    Ok(page("Leverage watch", &body))
}

pub fn render_history(rankings: &[DailyRanking], days: i64, enabled: bool) -> String {
    let mut body = format!("<h1>History, last {} days</h1>\n", days);

    if !enabled {
        body.push_str("<p class=\"warning\">History needs a configured database.</p>\n");
    } else if rankings.is_empty() {
        body.push_str("<p>No stored data for this period.</p>\n");
    }

    for ranking in rankings.iter().rev() {
        body.push_str(&format!("<h2>{}</h2>\n", ranking.date.format("%Y-%m-%d")));
        body.push_str(&records_table(&ranking.data));
    }

    page("History", &body)
}

pub fn render_about(sources: &[String], threshold: f64) -> String {
    let body = format!(
        "<h1>About</h1>\n\
         <p>The ratio is a leverage indicator derived from public market data. \
         Assets above {} are listed, highest first.</p>\n\
         <p>Sources, in order of preference: {}. When none answers, the last \
         snapshot younger than an hour is shown, then stored rows, then a \
         sample table.</p>\n",
        threshold,
        escape_html(&sources.join(", "))
    );

    page("About", &body)
}

fn records_table(records: &[AssetRecord]) -> String {
    let mut table = String::from(
        "<table>\n<thead><tr><th>#</th><th>Asset</th><th>Borrowed</th>\
         <th>Repaid</th><th>Ratio</th></tr></thead>\n<tbody>\n",
    );

    for (position, record) in records.iter().enumerate() {
        let name = record
            .name
            .as_deref()
            .map(|name| format!(" <small>{}</small>", escape_html(name)))
            .unwrap_or_default();

        table.push_str(&format!(
            "<tr><td>{}</td><td>{}{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n",
            position + 1,
            escape_html(&record.symbol),
            name,
            format_large_number(record.borrow_amount, 1),
            format_large_number(record.repay_amount, 1),
            record.ratio
        ));
    }

    table.push_str("</tbody>\n</table>\n");
    table
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <link rel=\"stylesheet\" href=\"/static/style.css\">\n\
         <script src=\"https://cdn.jsdelivr.net/npm/chart.js@4\" defer></script>\n\
         <script src=\"/static/app.js\" defer></script>\n\
         </head>\n<body>\n<nav><a href=\"/\">Ranking</a> <a href=\"/history\">History</a> \
         <a href=\"/about\">About</a></nav>\n<main>\n{}</main>\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}
