use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use extruct_client::fetcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use extruct_client::{FetchConfig, HtmlExtractor, ReqwestFetcher};
use extruct_core::{
    DEFAULT_SCHEMA_CONTEXT, ErrorMode, MetadataOptions, MetadataService, Syntax, emit, render_json,
};

/// Log directives used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "extruct=warn";

#[derive(Parser, Debug)]
#[command(
    name = "extruct",
    version,
    about = "Extract embedded metadata (microdata, OpenGraph, microformats, JSON-LD, RDFa) from a web page"
)]
struct Cli {
    /// The target URL
    url: String,

    /// Syntaxes to extract, e.g. `--syntaxes microdata opengraph json-ld`
    #[arg(long, value_enum, num_args = 1.., default_values_t = SyntaxArg::all())]
    syntaxes: Vec<SyntaxArg>,

    /// Reshape every item into `@context` / `@type` / flattened properties
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    uniform: bool,

    /// Schema context for the current page
    #[arg(
        long = "schema_context",
        visible_alias = "schema-context",
        default_value = DEFAULT_SCHEMA_CONTEXT
    )]
    schema_context: String,

    /// What to do when a syntax fails: raise it, log it, or ignore it
    #[arg(long, value_enum, default_value_t = ErrorsArg::Log)]
    errors: ErrorsArg,

    /// Print the metadata to standard output instead of standard error
    #[arg(long, default_value_t = false)]
    stdout: bool,

    /// Request timeout in seconds
    #[arg(long, env = "EXTRUCT_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// User-Agent header sent with the request
    #[arg(long, env = "EXTRUCT_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SyntaxArg {
    Microdata,
    Opengraph,
    Microformat,
    #[value(name = "json-ld")]
    JsonLd,
    Rdfa,
}

impl SyntaxArg {
    fn all() -> Vec<SyntaxArg> {
        Syntax::ALL.into_iter().map(SyntaxArg::from).collect()
    }
}

impl From<Syntax> for SyntaxArg {
    fn from(syntax: Syntax) -> Self {
        match syntax {
            Syntax::Microdata => SyntaxArg::Microdata,
            Syntax::Opengraph => SyntaxArg::Opengraph,
            Syntax::Microformat => SyntaxArg::Microformat,
            Syntax::JsonLd => SyntaxArg::JsonLd,
            Syntax::Rdfa => SyntaxArg::Rdfa,
        }
    }
}

impl From<SyntaxArg> for Syntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Microdata => Syntax::Microdata,
            SyntaxArg::Opengraph => Syntax::Opengraph,
            SyntaxArg::Microformat => Syntax::Microformat,
            SyntaxArg::JsonLd => Syntax::JsonLd,
            SyntaxArg::Rdfa => Syntax::Rdfa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorsArg {
    Strict,
    Log,
    Ignore,
}

impl From<ErrorsArg> for ErrorMode {
    fn from(arg: ErrorsArg) -> Self {
        match arg {
            ErrorsArg::Strict => ErrorMode::Strict,
            ErrorsArg::Log => ErrorMode::Log,
            ErrorsArg::Ignore => ErrorMode::Ignore,
        }
    }
}

impl Cli {
    fn options(&self) -> MetadataOptions {
        let mut syntaxes: Vec<Syntax> = Vec::new();
        for syntax in self.syntaxes.iter().copied().map(Syntax::from) {
            if !syntaxes.contains(&syntax) {
                syntaxes.push(syntax);
            }
        }

        MetadataOptions {
            syntaxes,
            uniform: self.uniform,
            schema_context: self.schema_context.clone(),
            errors: self.errors.into(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let value = run(&cli, &mut io::stdout().lock()).await?;
    if !value.is_empty() {
        emit(&value, &mut io::stderr().lock())?;
    }

    Ok(())
}

/// `RUST_LOG` directives replace the default filter entirely.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Fetch, extract and render. Returns the program value: empty when the
/// JSON was written to `stdout`, otherwise the JSON itself.
async fn run<W: Write>(cli: &Cli, stdout: &mut W) -> Result<String> {
    let config = FetchConfig::new(cli.timeout, &cli.user_agent)?;
    let fetcher = ReqwestFetcher::with_config(&config).context("Failed to create HTTP client")?;
    let service = MetadataService::new(fetcher, HtmlExtractor::new());

    let options = cli.options();
    tracing::debug!(url = %cli.url, ?options, timeout = cli.timeout, "Resolved options");

    let record = service
        .metadata_from_url(&cli.url, &options)
        .await
        .with_context(|| format!("Failed to extract metadata from {}", cli.url))?;

    let json = render_json(&record)?;
    Ok(route_output(json, cli.stdout, stdout)?)
}

/// Emit `json` to `out` when `to_stdout` is set and return an empty value;
/// otherwise hand the JSON back to the caller.
fn route_output<W: Write>(json: String, to_stdout: bool, out: &mut W) -> io::Result<String> {
    if to_stdout {
        emit(&json, out)?;
        Ok(String::new())
    } else {
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use tracing_subscriber::filter::LevelFilter;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("extruct").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["https://example.com"]).unwrap();
        let opts = cli.options();

        assert_eq!(cli.url, "https://example.com");
        assert_eq!(opts.syntaxes, Syntax::ALL.to_vec());
        assert!(!opts.uniform);
        assert_eq!(opts.schema_context, "http://schema.org");
        assert_eq!(opts.errors, ErrorMode::Log);
        assert!(!cli.stdout);
    }

    #[test]
    fn test_syntaxes_subset() {
        let cli = parse(&[
            "https://example.com",
            "--syntaxes",
            "microdata",
            "json-ld",
            "microdata",
        ])
        .unwrap();
        assert_eq!(
            cli.options().syntaxes,
            vec![Syntax::Microdata, Syntax::JsonLd]
        );
    }

    #[test]
    fn test_invalid_syntax_rejected() {
        let err = parse(&["https://example.com", "--syntaxes", "yaml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_invalid_errors_value_rejected() {
        let err = parse(&["https://example.com", "--errors", "bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_errors_values() {
        for (raw, mode) in [
            ("strict", ErrorMode::Strict),
            ("log", ErrorMode::Log),
            ("ignore", ErrorMode::Ignore),
        ] {
            let cli = parse(&["https://example.com", "--errors", raw]).unwrap();
            assert_eq!(cli.options().errors, mode);
        }
    }

    #[test]
    fn test_uniform_forms() {
        assert!(parse(&["https://example.com", "--uniform"]).unwrap().uniform);
        assert!(parse(&["https://example.com", "--uniform", "true"]).unwrap().uniform);
        assert!(parse(&["https://example.com", "--uniform", "yes"]).unwrap().uniform);
        assert!(!parse(&["https://example.com", "--uniform", "false"]).unwrap().uniform);
        assert!(parse(&["https://example.com", "--uniform", "maybe"]).is_err());
    }

    #[test]
    fn test_schema_context_spellings() {
        let cli = parse(&["https://example.com", "--schema_context", "https://schema.org"]).unwrap();
        assert_eq!(cli.options().schema_context, "https://schema.org");

        let cli = parse(&["https://example.com", "--schema-context", "https://schema.org"]).unwrap();
        assert_eq!(cli.options().schema_context, "https://schema.org");
    }

    #[test]
    fn test_url_is_required() {
        let err = parse(&["--stdout"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_log_filter_default_is_warn() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_log_filter_env_directive_is_not_overridden() {
        let filter = log_filter(Some("extruct=debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_route_output_to_stdout() {
        let mut out = Vec::new();
        let value = route_output("{}".to_string(), true, &mut out).unwrap();
        assert!(value.is_empty());
        assert_eq!(out, b"{}\n");
    }

    #[test]
    fn test_route_output_returns_json() {
        let mut out = Vec::new();
        let value = route_output("{}".to_string(), false, &mut out).unwrap();
        assert_eq!(value, "{}");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_run_not_found_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/gone", server.uri());
        let cli = parse(&[&url]).unwrap();
        let mut out = Vec::new();
        let value = run(&cli, &mut out).await.unwrap();

        assert_eq!(
            value,
            format!("{{\n  \"status\": \"404 Not Found\",\n  \"url\": \"{url}\"\n}}")
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_run_with_stdout_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script type="application/ld+json">{"@type": "Thing"}</script>"#,
            ))
            .mount(&server)
            .await;

        let cli = parse(&[&server.uri(), "--stdout", "--syntaxes", "json-ld"]).unwrap();
        let mut out = Vec::new();
        let value = run(&cli, &mut out).await.unwrap();

        assert!(value.is_empty());
        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["status"], "200 OK");
        assert_eq!(printed["json-ld"], serde_json::json!([{"@type": "Thing"}]));
    }

    #[tokio::test]
    async fn test_run_strict_extraction_error_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script type="application/ld+json">{not json</script>"#,
            ))
            .mount(&server)
            .await;

        let cli = parse(&[&server.uri(), "--errors", "strict"]).unwrap();
        let err = run(&cli, &mut Vec::new()).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to extract json-ld"));
    }
}
