use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use uuid::Uuid;

const GENERATING_HINT: &str = "Generiere Fragen...";
const EVALUATING_HINT: &str = "Erstelle Auswertung...";
const POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("unknown screen `{0}`")]
    UnknownScreen(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid session id: {0}")]
    InvalidSessionId(#[from] uuid::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("input closed")]
    InputClosed,
}

#[derive(Parser, Debug)]
#[command(name = "allergy-check-cli", about = "Terminal frontend for the Allergie-Check service")]
struct Cli {
    #[arg(long, env = "ALLERGY_CHECK_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the service is up.
    Ping,
    /// Walk through the questionnaire interactively.
    Run(RunArgs),
    /// Generate questions for the given user data and print them as JSON.
    Generate(UserArgs),
    /// Evaluate a JSON array of `{question, answer}` objects.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// `three_step` or `with_email`; the service default when omitted.
    #[arg(long)]
    variant: Option<String>,
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    age: u8,
    /// Männlich, Weiblich or Divers.
    #[arg(long)]
    gender: String,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[command(flatten)]
    user: UserArgs,
    #[arg(long, default_value = "-", help = "Answers file path, or - for stdin")]
    answers: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let api = Api::new(&cli.base_url);

    match cli.command {
        Command::Ping => run_ping(&api).await,
        Command::Run(args) => {
            let stdin = io::stdin();
            run_flow(&api, args.variant, &mut stdin.lock()).await
        }
        Command::Generate(user) => run_generate(&api, user).await,
        Command::Evaluate(args) => run_evaluate(&api, args).await,
    }
}

// =============================================================================
// HTTP
// =============================================================================

struct Api {
    http: reqwest::Client,
    base_url: String,
}

impl Api {
    fn new(base_url: &str) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }

    async fn request(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value, CliError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.http.request(method, &url);
        let request = if let Some(json) = body { request.json(&json) } else { request };

        let response = request.send().await?;
        let status = response.status();
        let value = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Null);

        if !status.is_success() {
            return Err(CliError::ServerError { status: status.as_u16(), message: error_message(&value) });
        }
        Ok(value)
    }

    async fn get(&self, path: &str) -> Result<Value, CliError> {
        self.request(reqwest::Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, CliError> {
        self.request(reqwest::Method::POST, path, Some(body)).await
    }
}

fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map_or_else(|| body.to_string(), str::to_owned)
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_ping(api: &Api) -> Result<(), CliError> {
    let response = api.http.get(format!("{}/healthz", api.base_url)).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_generate(api: &Api, user: UserArgs) -> Result<(), CliError> {
    let questions = api
        .post("/api/generate-questions", json!({ "age": user.age, "gender": user.gender }))
        .await?;
    print_json(&questions)
}

async fn run_evaluate(api: &Api, args: EvaluateArgs) -> Result<(), CliError> {
    let mut raw = String::new();
    if args.answers == "-" {
        io::stdin().read_to_string(&mut raw)?;
    } else {
        BufReader::new(File::open(&args.answers)?).read_to_string(&mut raw)?;
    }
    let answers: Value = serde_json::from_str(&raw)?;
    let body = json!({
        "userData": { "age": args.user.age, "gender": args.user.gender },
        "answers": answers,
    });
    let response = api.post("/api/evaluate-answers", body).await?;
    let evaluation = response
        .get("evaluation")
        .and_then(Value::as_str)
        .ok_or(CliError::MissingField("evaluation"))?;
    println!("{evaluation}");
    Ok(())
}

// =============================================================================
// INTERACTIVE FLOW
// =============================================================================

async fn run_flow(api: &Api, variant: Option<String>, input: &mut impl BufRead) -> Result<(), CliError> {
    let mut view = api.post("/api/sessions", json!({ "variant": variant })).await?;
    let id: Uuid = field_str(&view, "id")?.parse()?;
    let base = format!("/api/sessions/{id}");

    let result = loop {
        let screen = view.get("screen").ok_or(CliError::MissingField("screen"))?;
        let kind = field_str(screen, "kind")?;
        let step = match kind {
            "welcome" => welcome_screen(api, &base, screen, input).await,
            "questionnaire" => questionnaire_screen(api, &base, &view, screen, input).await,
            "email_form" => email_screen(api, &base, screen, input).await,
            "generating_questions" | "loading_spinner" => {
                println!("{}", screen.get("text").and_then(Value::as_str).unwrap_or(EVALUATING_HINT));
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                api.get(&base).await.map(Some)
            }
            "results" => {
                println!("\n{}\n", field_str(screen, "title")?);
                println!("{}", render_blocks(screen.get("blocks").unwrap_or(&Value::Null)));
                let label = field_str(screen, "restartLabel")?;
                restart_if(api, &base, confirm(input, &format!("{label}?"), false)?).await
            }
            "error" => {
                println!("\n{}", field_str(screen, "title")?);
                println!("{}\n", field_str(screen, "message")?);
                let label = field_str(screen, "actionLabel")?;
                restart_if(api, &base, confirm(input, &format!("{label}?"), true)?).await
            }
            other => Err(CliError::UnknownScreen(other.to_owned())),
        };
        match step {
            Ok(Some(next)) => view = next,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    // Best effort; an undeleted session is evicted once it has been idle long enough.
    if let Err(e) = api.request(reqwest::Method::DELETE, &base, None).await {
        eprintln!("Sitzung konnte nicht gelöscht werden: {e}");
    }
    result
}

async fn welcome_screen(
    api: &Api,
    base: &str,
    screen: &Value,
    input: &mut impl BufRead,
) -> Result<Option<Value>, CliError> {
    println!("\n{}", field_str(screen, "title")?);
    println!("{}\n", field_str(screen, "intro")?);
    let genders = string_list(screen.get("genders"));

    loop {
        let age = prompt(input, "Alter")?;
        for (i, label) in genders.iter().enumerate() {
            println!("  {}) {label}", i + 1);
        }
        let raw_gender = prompt(input, "Geschlecht")?;
        let gender = parse_choice(&raw_gender, &genders).unwrap_or(raw_gender.as_str()).to_owned();
        println!("\n{}", field_str(screen, "consentText")?);
        let consent = confirm(input, "Einverstanden?", false)?;

        let body = json!({ "age": age, "gender": gender, "consent": consent });
        println!("{GENERATING_HINT}");
        match api.post(&format!("{base}/start"), body).await {
            Ok(view) => return Ok(Some(view)),
            Err(CliError::ServerError { status: 422, message }) => println!("{message}\n"),
            Err(e) => return Err(e),
        }
    }
}

async fn questionnaire_screen(
    api: &Api,
    base: &str,
    view: &Value,
    screen: &Value,
    input: &mut impl BufRead,
) -> Result<Option<Value>, CliError> {
    let progress = screen.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
    println!("\n{} {}", field_str(screen, "label")?, progress_bar(progress, 20));
    println!("{}", field_str(screen, "questionText")?);
    let options = string_list(screen.get("options"));
    for (i, option) in options.iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }

    let option = loop {
        let raw = prompt(input, "Ihre Wahl")?;
        if let Some(option) = parse_choice(&raw, &options) {
            break option.to_owned();
        }
        println!("Bitte wählen Sie eine Zahl zwischen 1 und {}.", options.len());
    };

    println!("> {option}");
    let delay = screen.get("selectionDelayMs").and_then(Value::as_u64).unwrap_or(300);
    tokio::time::sleep(Duration::from_millis(delay)).await;

    let is_last = screen.get("index") == screen.get("total");
    if is_last && view.get("variant").and_then(Value::as_str) == Some("three_step") {
        println!("{EVALUATING_HINT}");
    }
    api.post(&format!("{base}/answer"), json!({ "option": option })).await.map(Some)
}

async fn email_screen(
    api: &Api,
    base: &str,
    screen: &Value,
    input: &mut impl BufRead,
) -> Result<Option<Value>, CliError> {
    println!("\n{}", field_str(screen, "title")?);
    println!("{}\n", field_str(screen, "text")?);

    loop {
        let email = prompt(input, "E-Mail")?;
        println!("{}", field_str(screen, "consentText")?);
        let consent = confirm(input, "Einverstanden?", false)?;

        println!("{EVALUATING_HINT}");
        match api.post(&format!("{base}/email"), json!({ "email": email, "consent": consent })).await {
            Ok(view) => return Ok(Some(view)),
            Err(CliError::ServerError { status: 422, message }) => println!("{message}\n"),
            Err(e) => return Err(e),
        }
    }
}

async fn restart_if(api: &Api, base: &str, restart: bool) -> Result<Option<Value>, CliError> {
    if !restart {
        return Ok(None);
    }
    api.post(&format!("{base}/restart"), json!({})).await.map(Some)
}

// =============================================================================
// TERMINAL HELPERS
// =============================================================================

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String, CliError> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(CliError::InputClosed);
    }
    Ok(line.trim().to_owned())
}

fn confirm(input: &mut impl BufRead, label: &str, default_yes: bool) -> Result<bool, CliError> {
    let hint = if default_yes { "[J/n]" } else { "[j/N]" };
    let answer = prompt(input, &format!("{label} {hint}"))?;
    Ok(parse_yes_no(&answer, default_yes))
}

fn parse_yes_no(answer: &str, default_yes: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "" => default_yes,
        "j" | "ja" | "y" | "yes" => true,
        _ => false,
    }
}

/// 1-based number or the exact option text.
fn parse_choice<'a>(raw: &str, options: &'a [String]) -> Option<&'a str> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).map(String::as_str);
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(raw))
        .map(String::as_str)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}] {percent:.0}%", "#".repeat(filled), "-".repeat(width - filled))
}

fn render_blocks(blocks: &Value) -> String {
    let Some(blocks) = blocks.as_array() else {
        return String::new();
    };
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        let text = block.get("text").and_then(Value::as_str).unwrap_or_default();
        match block.get("kind").and_then(Value::as_str) {
            Some("heading") => out.push(format!("\n{}\n{}", text, "=".repeat(text.chars().count()))),
            Some("list_item") => out.push(format!("  • {text}")),
            Some("break") => out.push(String::new()),
            _ => out.push(text.to_owned()),
        }
    }
    out.join("\n")
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default()
}

fn field_str<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, CliError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or(CliError::MissingField(field))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Ja".into(), "Nein".into(), "Manchmal".into()]
    }

    #[test]
    fn choice_by_number_or_text() {
        let opts = options();
        assert_eq!(parse_choice("2", &opts), Some("Nein"));
        assert_eq!(parse_choice(" manchmal ", &opts), Some("Manchmal"));
        assert_eq!(parse_choice("0", &opts), None);
        assert_eq!(parse_choice("4", &opts), None);
        assert_eq!(parse_choice("vielleicht", &opts), None);
    }

    #[test]
    fn yes_no_defaults() {
        assert!(parse_yes_no("", true));
        assert!(!parse_yes_no("", false));
        assert!(parse_yes_no("Ja", false));
        assert!(!parse_yes_no("nein", true));
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0, 4), "[----] 0%");
        assert_eq!(progress_bar(50.0, 4), "[##--] 50%");
        assert_eq!(progress_bar(150.0, 4), "[####] 150%");
    }

    #[test]
    fn blocks_render_as_text() {
        let blocks = json!([
            { "kind": "heading", "text": "Fazit" },
            { "kind": "list_item", "text": "Pollen" },
            { "kind": "break" },
            { "kind": "paragraph", "text": "Ende" }
        ]);
        assert_eq!(render_blocks(&blocks), "\nFazit\n=====\n  • Pollen\n\nEnde");
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(error_message(&json!({ "error": "Fehler", "code": "E_X" })), "Fehler");
        assert_eq!(error_message(&Value::Null), "null");
    }

    #[test]
    fn prompt_reads_trimmed_line_and_detects_eof() {
        let mut input = io::Cursor::new(b"  34 \n".to_vec());
        assert_eq!(prompt(&mut input, "Alter").unwrap(), "34");
        assert!(matches!(prompt(&mut input, "Alter"), Err(CliError::InputClosed)));
    }
}
