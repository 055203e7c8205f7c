use clap::{value_parser, Arg, Command};
use std::env;
use std::process;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn, Level};

mod api;
mod prompts;
mod tools;
mod utils;

use api::{AppState, ServerConfig};
use utils::inference::InferenceConfig;

const BANNER_WIDTH: usize = 56;

/// Startup banner lines: title, bind address and whether model calls can work.
fn banner_lines(server: &ServerConfig, endpoint_configured: bool) -> Vec<String> {
    let model_line = if endpoint_configured {
        "model: connected to inference endpoint"
    } else {
        "model: not configured (set INFERENCE_URL)"
    };

    [
        format!("Report Lens v{}", env!("CARGO_PKG_VERSION")),
        String::new(),
        format!("http://{}:{}", server.host, server.port),
        model_line.to_string(),
    ]
    .into_iter()
    .map(|line| format!("| {:^width$} |", line, width = BANNER_WIDTH))
    .collect()
}

fn print_banner(lines: &[String]) {
    let rule = format!("+{}+", "-".repeat(BANNER_WIDTH + 2));
    eprintln!("\n\x1b[36m{}", rule);
    for line in lines {
        eprintln!("{}", line);
    }
    eprintln!("{}\x1b[0m\n", rule);
}

fn cli() -> Command {
    Command::new("report-lens")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Upload a medical report, read it as markdown and ask a model about it")
        .long_about(
            "Serves a small web UI and JSON API:\n\
            - POST /api/upload-document: PDF, image or text report to markdown\n\
            - POST /api/generate-summary: short model-written summary\n\
            - POST /api/explain-sentence: plain-language explanation of one sentence\n\
            - POST /api/chat: questions about the uploaded report\n\
            - GET  /api/cache-status: cached explanation count",
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .value_name("URL")
                .help("Inference endpoint URL (or INFERENCE_URL)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("Bearer token for the inference endpoint (or HF_TOKEN)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("model-name")
                .long("model-name")
                .value_name("NAME")
                .help("Model name reported in chat responses (or MODEL_NAME)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .default_value("127.0.0.1")
                .help("Address to bind"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .default_value("5000")
                .value_parser(value_parser!(u16))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .default_value("120")
                .value_parser(value_parser!(u64))
                .help("Timeout for each inference request"),
        )
        .arg(
            Arg::new("max-tokens")
                .long("max-tokens")
                .value_name("N")
                .default_value("1000")
                .value_parser(value_parser!(u32))
                .help("max_tokens sent with every prompt"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors and skip the startup banner")
                .action(clap::ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let quiet = matches.get_flag("quiet");

    // RUST_LOG wins when it names a level; otherwise info, or errors only in quiet mode
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|value| Level::from_str(&value).ok())
        .unwrap_or(if quiet { Level::ERROR } else { Level::INFO });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level)
        .init();

    let endpoint = matches
        .get_one::<String>("endpoint")
        .cloned()
        .or_else(|| env::var("INFERENCE_URL").ok());

    let token = matches
        .get_one::<String>("token")
        .cloned()
        .or_else(|| env::var("HF_TOKEN").ok());

    let model_name = matches
        .get_one::<String>("model-name")
        .cloned()
        .or_else(|| env::var("MODEL_NAME").ok());

    let endpoint = match endpoint.map(|raw| url::Url::parse(&raw)) {
        Some(Ok(url)) => {
            info!("Inference endpoint: {}", url);
            Some(url)
        }
        Some(Err(e)) => {
            error!("Invalid inference endpoint URL: {}", e);
            process::exit(2);
        }
        None => {
            warn!("No inference endpoint configured - summaries, explanations and chat will fail until INFERENCE_URL is set");
            None
        }
    };

    // Never log the token itself
    if token.is_some() {
        info!("Inference token configured");
    }

    let mut inference = InferenceConfig {
        endpoint,
        token,
        timeout: Duration::from_secs(*matches.get_one::<u64>("timeout").unwrap_or(&120)),
        max_tokens: *matches.get_one::<u32>("max-tokens").unwrap_or(&1000),
        ..Default::default()
    };
    if let Some(name) = model_name {
        inference.model_name = name;
    }

    let server = ServerConfig {
        host: matches
            .get_one::<String>("host")
            .cloned()
            .unwrap_or_else(|| "127.0.0.1".to_string()),
        port: *matches.get_one::<u16>("port").unwrap_or(&5000),
    };

    if !quiet {
        print_banner(&banner_lines(&server, inference.endpoint.is_some()));
    }

    let state = match AppState::new(&inference) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialise inference client: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = api::serve(state, &server).await {
        error!("Server stopped: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_shows_address_and_model_state() {
        let server = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };

        let lines = banner_lines(&server, false);
        assert!(lines.iter().all(|line| line.chars().count() == BANNER_WIDTH + 4));
        assert!(lines.iter().any(|line| line.contains("http://0.0.0.0:8080")));
        assert!(lines.iter().any(|line| line.contains("not configured")));

        let lines = banner_lines(&server, true);
        assert!(lines.iter().any(|line| line.contains("connected")));
    }

    #[test]
    fn cli_defaults() {
        let matches = cli().try_get_matches_from(["report-lens"]).unwrap();
        assert_eq!(matches.get_one::<u16>("port"), Some(&5000));
        assert_eq!(matches.get_one::<String>("host").map(String::as_str), Some("127.0.0.1"));
        assert_eq!(matches.get_one::<u32>("max-tokens"), Some(&1000));
        assert!(!matches.get_flag("quiet"));
    }

    #[test]
    fn cli_rejects_bad_port() {
        assert!(cli().try_get_matches_from(["report-lens", "--port", "99999"]).is_err());
    }
}
