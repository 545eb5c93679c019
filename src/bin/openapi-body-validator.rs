//! OpenAPI Body Validator CLI
//!
//! Command-line interface for validating request bodies against an OpenAPI contract.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use openapi_body_validator::{
    load_contract_auto, Document, Fingerprint, RequestBodyValidator, ValidateError,
    ValidatorOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-body-validator")]
#[command(about = "Validate HTTP request bodies against an OpenAPI contract")]
#[command(version)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a request body against the contract
    Validate {
        /// Contract source: file path or URL (http:// or https://)
        contract: String,

        /// HTTP method of the request (e.g., POST, PUT)
        #[arg(long, short)]
        method: String,

        /// Request path, optionally with a query string (e.g., /pets?limit=10)
        #[arg(long, short)]
        path: String,

        /// Content-Type header of the request (omit to send none)
        #[arg(long)]
        content_type: Option<String>,

        /// File holding the request body (empty body if not specified)
        #[arg(long)]
        body: Option<PathBuf>,

        /// Pin this path template instead of resolving the request path
        #[arg(long)]
        pin: Option<String>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Strict mode: reject unknown fields
        #[arg(long)]
        strict: bool,

        /// Assert `format` keywords (date-time, email, ...)
        #[arg(long)]
        format_assertions: bool,
    },

    /// List the distinct request body schemas and the operations sharing them
    Schemas {
        /// Contract source: file path or URL (http:// or https://)
        contract: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that every request body schema in the contract renders
    Check {
        /// Contract source: file path or URL (http:// or https://)
        contract: String,

        /// Render with strict mode enabled
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate {
            contract,
            method,
            path,
            content_type,
            body,
            pin,
            json,
            strict,
            format_assertions,
        } => run_validate(ValidateArgs {
            contract,
            method,
            path,
            content_type,
            body,
            pin,
            json_output: json,
            options: ValidatorOptions::new()
                .strict(strict)
                .format_assertions(format_assertions),
        }),

        Commands::Schemas { contract, json } => run_schemas(&contract, json),

        Commands::Check { contract, strict } => run_check(&contract, strict),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct ValidateArgs {
    contract: String,
    method: String,
    path: String,
    content_type: Option<String>,
    body: Option<PathBuf>,
    pin: Option<String>,
    json_output: bool,
    options: ValidatorOptions,
}

fn run_validate(args: ValidateArgs) -> Result<(), u8> {
    let ValidateArgs {
        contract,
        method,
        path,
        content_type,
        body,
        pin,
        json_output,
        options,
    } = args;

    let document = load_document(&contract, json_output)?;
    let validator =
        RequestBodyValidator::with_options(Arc::clone(&document), options).map_err(|e| {
            report_error(json_output, &e.to_string());
            e.exit_code() as u8
        })?;

    if let Some(template) = pin {
        let Some(item) = document.path_item(&template) else {
            report_error(
                json_output,
                &format!("path '{}' is not declared in the contract", template),
            );
            return Err(2);
        };
        validator.set_path_item(item.clone(), template).map_err(|e| {
            report_error(json_output, &e.to_string());
            e.exit_code() as u8
        })?;
    }

    let payload = match &body {
        Some(file) => std::fs::read(file).map_err(|e| {
            report_error(
                json_output,
                &format!("cannot read body {}: {}", file.display(), e),
            );
            3u8
        })?,
        None => Vec::new(),
    };

    let mut builder = http::Request::builder()
        .method(method.to_ascii_uppercase().as_str())
        .uri(path.as_str());
    if let Some(ct) = &content_type {
        builder = builder.header(http::header::CONTENT_TYPE, ct.as_str());
    }
    let request = builder.body(payload).map_err(|e| {
        report_error(json_output, &format!("invalid request: {}", e));
        2u8
    })?;

    match validator.validate_request_body(&request) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in &errors {
                    eprintln!("  {}", error.message);
                    eprintln!("    {}", error.reason);
                    for schema_error in &error.schema_errors {
                        eprintln!("    - {}", schema_error);
                    }
                }
            }
            Err(1)
        }
        Err(e @ ValidateError::CacheMiss { .. }) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn run_schemas(contract: &str, json_output: bool) -> Result<(), u8> {
    let document = load_document(contract, json_output)?;
    let validator = RequestBodyValidator::new(Arc::clone(&document)).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    let usages = schema_usages(&document);

    if json_output {
        let schemas: Vec<serde_json::Value> = usages
            .iter()
            .map(|(fingerprint, used_by)| {
                serde_json::json!({
                    "fingerprint": fingerprint.to_hex(),
                    "used_by": used_by,
                })
            })
            .collect();
        let output = serde_json::json!({
            "openapi": document.openapi(),
            "schemas": schemas,
        });
        println!("{}", output);
    } else {
        println!(
            "{} distinct request body schema(s) in OpenAPI {} contract",
            validator.cache_len(),
            document.openapi()
        );
        for (fingerprint, used_by) in &usages {
            println!("{}", fingerprint);
            for usage in used_by {
                println!("  {}", usage);
            }
        }
    }

    Ok(())
}

fn run_check(contract: &str, strict: bool) -> Result<(), u8> {
    let document = load_document(contract, false)?;
    let options = ValidatorOptions::new().strict(strict);
    let validator = RequestBodyValidator::with_options(Arc::clone(&document), options)
        .map_err(|e| {
            report_error(false, &e.to_string());
            e.exit_code() as u8
        })?;

    let path_items = document.path_items().count();
    let operations: usize = document
        .path_items()
        .map(|(_, item)| item.operations_with_request_body().len())
        .sum();

    println!(
        "OK: {} path item(s), {} operation(s) with request bodies, {} distinct schema(s)",
        path_items,
        operations,
        validator.cache_len()
    );
    Ok(())
}

fn load_document(source: &str, json_output: bool) -> Result<Arc<Document>, u8> {
    load_contract_auto(source).map(Arc::new).map_err(|e| {
        report_error(json_output, &format!("loading contract: {}", e));
        e.exit_code() as u8
    })
}

/// Group `METHOD template (content type)` labels by schema fingerprint.
fn schema_usages(document: &Document) -> BTreeMap<Fingerprint, Vec<String>> {
    let mut usages: BTreeMap<Fingerprint, Vec<String>> = BTreeMap::new();
    for (template, item) in document.path_items() {
        for operation in item.operations_with_request_body() {
            let Some(body) = &operation.request_body else {
                continue;
            };
            for (content_type, media) in &body.content {
                if let Some(schema) = &media.schema {
                    usages
                        .entry(Fingerprint::of(schema, document.root()))
                        .or_default()
                        .push(format!("{} {} ({})", operation.method, template, content_type));
                }
            }
        }
    }
    usages
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_verbose_levels() {
        let cli0 = Cli::try_parse_from(["openapi-body-validator", "check", "api.yaml"]).unwrap();
        assert_eq!(cli0.verbose, 0);

        let cli2 =
            Cli::try_parse_from(["openapi-body-validator", "-vv", "check", "api.yaml"]).unwrap();
        assert_eq!(cli2.verbose, 2);
    }

    #[test]
    fn cli_parse_validate() {
        let cli = Cli::try_parse_from([
            "openapi-body-validator",
            "validate",
            "api.yaml",
            "--method",
            "post",
            "--path",
            "/pets",
            "--content-type",
            "application/json",
            "--pin",
            "/pets",
        ])
        .unwrap();
        match cli.command {
            Commands::Validate {
                method, pin, json, ..
            } => {
                assert_eq!(method, "post");
                assert_eq!(pin.as_deref(), Some("/pets"));
                assert!(!json);
            }
            _ => panic!("expected validate command"),
        }
    }

    #[test]
    fn cli_validate_requires_method_and_path() {
        assert!(Cli::try_parse_from(["openapi-body-validator", "validate", "api.yaml"]).is_err());
    }
}
