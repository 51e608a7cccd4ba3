use anyhow::{Context, Result};
use clap::Parser;
use retrieval_query::config::EditorConfig;
use retrieval_query::highlight::Highlighter;
use retrieval_query::parser::extract_clauses;
use retrieval_query::render::TextSurface;
use retrieval_query::suggest::{RequestId, SuggestionProvider, SuggestionRequest};
use retrieval_query::{EditorHooks, QueryStringEditor, TokenKind};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

type ConsoleEditor = QueryStringEditor<TextSurface, ConsoleHooks>;

#[derive(Parser, Debug)]
#[command(name = "retrieval-query", about = "检索语句编辑器交互终端")]
struct Args {
    /// JSON 配置文件
    #[arg(short, long, default_value = "query_editor.json")]
    config: PathBuf,
    /// 以 JSON 格式输出 token 列表
    #[arg(long)]
    json: bool,
}

/// 终端里的回调实现: 打印变更, 记录当前弹出的候选框
#[derive(Debug, Default)]
struct ConsoleHooks {
    popup: Option<(RequestId, SuggestionRequest)>,
    submitted: usize,
}

impl EditorHooks for ConsoleHooks {
    fn on_change(&mut self, query: &str) {
        println!("[变更]: {}", query);
    }

    fn on_query(&mut self) {
        self.submitted += 1;
        println!("[提交查询 #{}]", self.submitted);
    }

    fn pop_up(&mut self, id: RequestId, request: &SuggestionRequest) {
        self.popup = Some((id, request.clone()));
    }

    fn pop_down(&mut self) {
        self.popup = None;
    }
}

/// 加载配置，失败时使用默认配置
fn load_config(path: &Path) -> EditorConfig {
    match EditorConfig::from_json_file(path) {
        Ok(config) => {
            println!("✅ 成功加载配置文件: {}", path.display());
            config
        }
        Err(e) => {
            println!("⚠️ 无法加载配置文件 ({}), 使用默认配置", e);
            EditorConfig::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    println!("--- Retrieval Query: 检索语句编辑器 ---");

    let config = load_config(&args.config);
    let (highlighter, errors) = Highlighter::compile(&config.highlight_rules);
    for error in &errors {
        println!("⚠️ {}", error);
    }

    let mut editor = QueryStringEditor::new(
        TextSurface::new(),
        "",
        ConsoleHooks::default(),
        config.debounce(),
        config.formatter(),
    );

    let mut rl = DefaultEditor::new().context("无法初始化命令行")?;
    println!("输入检索语句后回车提交");
    println!("  /pick <kind> <text>  选择候选项 (key/method/value/condition)");
    println!("  /set <query>         直接替换语句");
    println!("  /quit                退出");

    loop {
        match rl.readline("qs> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if line == "/quit" {
                    break;
                }
                if let Some(rest) = line.strip_prefix("/pick ") {
                    pick(&mut editor, rest);
                } else if let Some(query) = line.strip_prefix("/set ") {
                    editor.set_query_string(query);
                } else {
                    type_line(&mut editor, &line, config.debounce());
                }
                report(&editor, &config, &highlighter, args.json)?;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("读取输入失败"),
        }
    }
    Ok(())
}

/// 模拟在输入框中键入整行, 等待防抖结束后回车
fn type_line(editor: &mut ConsoleEditor, line: &str, debounce: Duration) {
    let now = Instant::now();
    editor.surface_mut().set_raw_text(line);
    editor.input(now);
    editor.tick(now + debounce);
    editor.enter(now + debounce);
}

fn pick(editor: &mut ConsoleEditor, rest: &str) {
    let (kind, text) = rest.split_once(' ').unwrap_or((rest, ""));
    match TokenKind::parse(kind) {
        Some(kind) => editor.set_token(text, kind),
        None => println!("❌ 未知的 token 类型: {}", kind),
    }
}

fn report(
    editor: &ConsoleEditor,
    config: &EditorConfig,
    highlighter: &Highlighter,
    json: bool,
) -> Result<()> {
    println!("[Token]:");
    if json {
        println!("{}", serde_json::to_string_pretty(editor.tokens())?);
    } else {
        for (i, token) in editor.tokens().iter().enumerate() {
            println!("  {:>2} {:<15} {:?}", i, token.kind.to_string(), token.value);
        }
    }

    if let Some((id, request)) = &editor.hooks().popup {
        let result = config
            .suggestions
            .options(request.kind, &request.field, editor.search());
        let candidates = editor.receive_candidates(*id, result).unwrap_or_default();
        let names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
        println!(
            "[候选项 {} field={:?} search={:?}]: {}",
            request.kind,
            request.field,
            editor.search(),
            names.join(", ")
        );
    }

    let clauses = extract_clauses(editor.tokens());
    println!("[子句]: {}", serde_json::to_string(&clauses)?);

    if !highlighter.is_empty() {
        println!(
            "[高亮]: {}",
            highlighter.mark(editor.query_string(), "\x1b[1;33m", "\x1b[0m")
        );
    }
    Ok(())
}
