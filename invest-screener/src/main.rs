//! Command-line front end for the stock screener.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{debug, info};

use invest_common::util::truncate_with_ellipsis;
use invest_common::{Config, Validate};
use invest_screener::api::{AuthService, RegisterRequest};
use invest_screener::format::{format_cell, Align, Pagination, DEFAULT_TABLE_COLUMNS};
use invest_screener::store::parse_filter_value;
use invest_screener::{
    ApiClient, ApiError, AuthProvider, FilterCatalog, FilterCategory, HttpScreeningService,
    OptionsCache, RatingLetter, ScreenerStore, ScreeningService, Session, SortDirection,
};

/// Widest company name shown in the results table.
const NAME_WIDTH: usize = 28;

/// Stock screener for the investment dashboard.
#[derive(Parser, Debug)]
#[command(name = "invest-screener")]
#[command(version)]
#[command(about = "Screen stocks against composable filters.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the filters that can be used in a query
    Filters,

    /// Show the markets and sectors offered by the backend
    Options,

    /// Run one screening query
    Screen {
        /// Query string as it appears in a dashboard URL (e.g. "exchange=NYSE&pe_ratio=5-20")
        query: Option<String>,

        /// Market, repeatable
        #[arg(long = "exchange")]
        exchanges: Vec<String>,

        /// Sector, repeatable
        #[arg(long = "sector")]
        sectors: Vec<String>,

        /// Rating letter (A-D), repeatable
        #[arg(long = "rating")]
        ratings: Vec<RatingLetter>,

        /// Additional filter as key=value, repeatable (e.g. --filter pe_ratio=5-20)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Sort field
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page number (1-based)
        #[arg(long)]
        page: Option<u32>,

        /// Page size (20, 50, 100 or 200)
        #[arg(long)]
        size: Option<u32>,
    },

    /// Sign in and keep the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },

    /// Show the signed-in user
    Whoami,

    /// End the current session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_env()?;
    config.validate().context("Invalid configuration")?;

    invest_common::logging::init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );
    debug!(api = %config.api.base_url, "Configuration loaded");

    let session = Arc::new(Session::load(&config.session)?);
    let client = ApiClient::new(&config.api, session.clone())?;
    let catalog = FilterCatalog::standard();

    match cli.command {
        Commands::Filters => {
            print_filters(&catalog);
            Ok(())
        }

        Commands::Options => {
            let cache = OptionsCache::new(Arc::new(HttpScreeningService::new(client)));
            let options = cache.fetch().await.map_err(api_failure)?;
            println!("Markets: {}", options.exchanges.join(", "));
            println!("Sectors: {}", options.sectors.join(", "));
            if !options.countries.is_empty() {
                println!("Countries: {}", options.countries.join(", "));
            }
            Ok(())
        }

        Commands::Screen {
            query,
            exchanges,
            sectors,
            ratings,
            filters,
            sort,
            desc,
            page,
            size,
        } => {
            let store = ScreenerStore::new(catalog);
            if let Some(query) = query {
                store.hydrate_from_query_string(&query);
            }
            if !exchanges.is_empty() {
                store.set_primary_exchanges(exchanges);
            }
            if !sectors.is_empty() {
                store.set_primary_sectors(sectors);
            }
            if !ratings.is_empty() {
                store.set_primary_ratings(ratings);
            }
            for filter in &filters {
                apply_filter_arg(&store, filter)?;
            }
            if let Some(field) = sort {
                let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
                store.set_sort(&field, Some(direction));
            } else if desc {
                let field = store.snapshot().sort_field().to_string();
                store.set_sort(&field, Some(SortDirection::Desc));
            }
            if let Some(size) = size {
                store.set_page_size(size);
            }
            if let Some(page) = page {
                store.set_page(page);
            }

            screen(&store, &HttpScreeningService::new(client)).await
        }

        Commands::Login { email, password } => {
            let auth = AuthService::new(client);
            let grant = auth.login(&email, &password).await.map_err(api_failure)?;
            session.begin(grant.access_token)?;

            let user = auth.current_user().await.map_err(api_failure)?;
            info!(user_id = user.id, "Signed in");
            println!("Signed in as {} <{}>", user.username, user.email);
            session.set_user(user)?;
            Ok(())
        }

        Commands::Register {
            email,
            username,
            password,
            first_name,
            last_name,
        } => {
            let request = RegisterRequest {
                email,
                username,
                password,
                first_name,
                last_name,
            };
            let created = AuthService::new(client)
                .register(&request)
                .await
                .map_err(api_failure)?;
            println!("Registered {} <{}>", created.username, created.email);
            println!("Sign in with: invest-screener login --email {}", created.email);
            Ok(())
        }

        Commands::Whoami => {
            if !session.is_authenticated() {
                bail!("Not signed in");
            }
            let user = match session.user() {
                Some(user) => user,
                None => {
                    let user = AuthService::new(client)
                        .current_user()
                        .await
                        .map_err(api_failure)?;
                    session.set_user(user.clone())?;
                    user
                }
            };
            println!("{} <{}> (id {})", user.username, user.email, user.id);
            Ok(())
        }

        Commands::Logout => {
            session.logout()?;
            println!("Signed out");
            Ok(())
        }
    }
}

fn api_failure(err: ApiError) -> anyhow::Error {
    debug!(error = %err, "API call failed");
    anyhow!(err.user_message())
}

fn print_filters(catalog: &FilterCatalog) {
    for category in FilterCategory::ALL {
        println!("{}", category.label());
        for def in catalog.list_by_category(category) {
            let unit = def.unit.map(|u| format!(" ({})", u)).unwrap_or_default();
            let primary = if catalog.is_primary(def.key) { " [primary]" } else { "" };
            println!(
                "  {:<22} {:<11} {}{}{}",
                def.key,
                format!("{:?}", def.value_type).to_lowercase(),
                def.label,
                unit,
                primary
            );
        }
    }
}

/// Parse `key=value` against the catalog and add it to the store.
fn apply_filter_arg(store: &ScreenerStore, arg: &str) -> Result<()> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value, got '{}'", arg))?;
    let definition = store
        .catalog()
        .lookup(key.trim())
        .ok_or_else(|| anyhow!("Unknown filter '{}'; see `invest-screener filters`", key))?;
    let value = parse_filter_value(definition, raw)
        .ok_or_else(|| anyhow!("Invalid value '{}' for filter '{}'", raw, definition.key))?;
    store.set_additional_filter(definition.key, value);
    Ok(())
}

async fn screen(store: &ScreenerStore, service: &dyn ScreeningService) -> Result<()> {
    let state = store.snapshot();
    let request = store.derive_request();
    let response = service.screen_stocks(&request).await.map_err(api_failure)?;

    let rows: Vec<Vec<String>> = response
        .results
        .iter()
        .map(|stock| {
            DEFAULT_TABLE_COLUMNS
                .iter()
                .map(|column| match column.key {
                    "name" => truncate_with_ellipsis(&format_cell(stock, column), NAME_WIDTH),
                    _ => format_cell(stock, column),
                })
                .collect()
        })
        .collect();
    print_table(&rows);

    let pagination = Pagination::new(state.page(), state.page_size(), response.total_count);
    println!();
    println!(
        "{} (page {} of {})",
        pagination.summary(),
        pagination.page,
        pagination.total_pages()
    );
    let query = store.to_query_string();
    if !query.is_empty() {
        println!("Query: ?{}", query);
    }
    Ok(())
}

fn print_table(rows: &[Vec<String>]) {
    let widths: Vec<usize> = DEFAULT_TABLE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header = DEFAULT_TABLE_COLUMNS.iter().map(|c| (c.label, c.align));
    println!("{}", render_row(header, &widths));
    for row in rows {
        let cells = row
            .iter()
            .zip(DEFAULT_TABLE_COLUMNS)
            .map(|(text, column)| (text.as_str(), column.align));
        println!("{}", render_row(cells, &widths));
    }
}

fn render_row<'a>(cells: impl Iterator<Item = (&'a str, Align)>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .map(|((text, align), &width)| pad(text, width, align))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.chars().count());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_screen() {
        let cli = Cli::try_parse_from([
            "invest-screener",
            "screen",
            "exchange=NYSE",
            "--rating",
            "A",
            "--filter",
            "pe_ratio=5-20",
            "--desc",
        ])
        .unwrap();
        match cli.command {
            Commands::Screen {
                query,
                ratings,
                filters,
                desc,
                ..
            } => {
                assert_eq!(query.as_deref(), Some("exchange=NYSE"));
                assert_eq!(ratings, vec![RatingLetter::A]);
                assert_eq!(filters, vec!["pe_ratio=5-20".to_string()]);
                assert!(desc);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_apply_filter_arg() {
        let store = ScreenerStore::new(FilterCatalog::standard());
        apply_filter_arg(&store, "pe_ratio=5-20").unwrap();
        assert!(store.snapshot().additional_filter("pe_ratio").is_some());

        assert!(apply_filter_arg(&store, "nonsense=1").is_err());
        assert!(apply_filter_arg(&store, "pe_ratio").is_err());
        assert!(apply_filter_arg(&store, "pe_ratio=abc").is_err());
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4, Align::Left), "ab  ");
        assert_eq!(pad("ab", 4, Align::Right), "  ab");
        assert_eq!(pad("ab", 5, Align::Center), " ab  ");
    }
}
