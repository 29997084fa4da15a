/*!
# minidesk

A small multi-page web application, built in Rust.

## Pages

- **Calculator** (`/`) - adds, subtracts, multiplies or divides two numbers and
  keeps a per-session history of results, with a button to clear it.
- **Projects** (`/projects`) - up to three project names stored one per line
  in a plain text file, with add, rename and delete.
- **Stocks** (`/stocks`) - latest daily open/high/low/close/volume for a
  ticker, fetched from the Alpha Vantage `TIME_SERIES_DAILY` endpoint.

## Architecture

### Domain Layer
- **saving**: flat-file project store behind the `ProjectStore` trait
- **projects**: add/update/delete with write-through and rollback
- **calculator**: arithmetic, result formatting, history entries
- **stocks**: ticker normalisation, response classification, quote client

### Web Layer (feature `web`)
- **session**: per-client key-value store keyed by a cookie
- **views**: handlebars templates for the three pages
- **app**: axum router, shared state and handlers

## Configuration

Read from the environment by `Config::from_env`:

- `ALPHA_VANTAGE_API_KEY` - quote provider key, `demo` when unset
- `MINIDESK_PROJECTS_FILE` - project list file, `projects.txt` by default
- `MINIDESK_ADDR` - listen address, `127.0.0.1:3000` by default
- `MINIDESK_STOCK_API_URL`, `MINIDESK_STOCK_TIMEOUT_SECS`, `MINIDESK_STATIC_DIR`

Log output goes through `env_logger`; set `RUST_LOG` to change the level.
*/

pub mod calculator;
pub mod config;
pub mod error;
pub mod projects;
pub mod saving;
pub mod stocks;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod session;
#[cfg(feature = "web")]
pub mod views;

pub use calculator::*;
pub use error::*;
pub use projects::*;
pub use saving::*;
pub use stocks::*;
