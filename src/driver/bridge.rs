//! Long-lived Node/Playwright helper process.
//!
//! A single helper process is spawned per session with `node -e` and driven
//! over newline-delimited JSON: one request line in on stdin, one response
//! line out on stdout. The inline script holds the browser, context, and page
//! for the lifetime of the session.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::{BrowserKind, SuiteConfig, DEFAULT_OPERATION_TIMEOUT};
use crate::driver::{PageDriver, SessionBackend};
use crate::{Result, SuiteError};

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');

let browser = null;
let context = null;
let page = null;

function reply(payload) {
  process.stdout.write(JSON.stringify(payload) + '\n');
}

const rl = readline.createInterface({ input: process.stdin, terminal: false });

rl.on('line', async (line) => {
  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    reply({ status: 'error', message: 'bad request: ' + err.message });
    return;
  }
  try {
    switch (req.cmd) {
      case 'launch': {
        const { chromium, firefox, webkit } = require('playwright');
        const engines = { chromium, firefox, webkit };
        const engine = engines[req.browser] || chromium;
        browser = await engine.launch({ headless: req.headless });
        reply({ status: 'ok' });
        break;
      }
      case 'context':
        context = await browser.newContext({
          viewport: { width: 1920, height: 1080 },
          ignoreHTTPSErrors: true
        });
        reply({ status: 'ok' });
        break;
      case 'page':
        page = await context.newPage();
        page.setDefaultTimeout(req.timeoutMs);
        page.setDefaultNavigationTimeout(req.navigationTimeoutMs);
        reply({ status: 'ok' });
        break;
      case 'navigate':
        await page.goto(req.url);
        reply({ status: 'ok' });
        break;
      case 'click':
        await page.click(req.selector);
        reply({ status: 'ok' });
        break;
      case 'fill':
        await page.fill(req.selector, req.value);
        reply({ status: 'ok' });
        break;
      case 'readText': {
        const text = await page.textContent(req.selector);
        reply({ status: 'ok', text: text || '' });
        break;
      }
      case 'isVisible': {
        const visible = await page.isVisible(req.selector);
        reply({ status: 'ok', visible });
        break;
      }
      case 'waitFor':
        await page.waitForSelector(req.selector);
        reply({ status: 'ok' });
        break;
      case 'screenshot':
        await page.screenshot({ path: req.path, fullPage: req.fullPage });
        reply({ status: 'ok' });
        break;
      case 'closePage':
        if (page) { await page.close(); page = null; }
        reply({ status: 'ok' });
        break;
      case 'closeContext':
        if (context) { await context.close(); context = null; }
        reply({ status: 'ok' });
        break;
      case 'closeBrowser':
        if (browser) { await browser.close(); browser = null; }
        reply({ status: 'ok' });
        break;
      default:
        reply({ status: 'error', message: 'unknown command: ' + req.cmd });
    }
  } catch (err) {
    reply({ status: 'error', message: err && err.message ? err.message : String(err) });
  }
});

rl.on('close', () => process.exit(0));
"#;

/// Timeout for checking node/playwright availability.
const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Configuration for one bridge process.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    pub browser: BrowserKind,
    pub headless: bool,
    /// Timeout applied to every bridge command.
    pub operation_timeout: Duration,
    /// Timeout applied to navigations.
    pub navigation_timeout: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            navigation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl BridgeOptions {
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            node_command: config.node_command.clone(),
            browser: config.browser,
            headless: config.headless,
            operation_timeout: config.default_timeout,
            navigation_timeout: config.navigation_timeout,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
enum BridgeRequest<'a> {
    Launch {
        browser: &'a str,
        headless: bool,
    },
    Context,
    #[serde(rename_all = "camelCase")]
    Page {
        timeout_ms: u64,
        navigation_timeout_ms: u64,
    },
    Navigate {
        url: &'a str,
    },
    Click {
        selector: &'a str,
    },
    Fill {
        selector: &'a str,
        value: &'a str,
    },
    ReadText {
        selector: &'a str,
    },
    IsVisible {
        selector: &'a str,
    },
    WaitFor {
        selector: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Screenshot {
        path: &'a str,
        full_page: bool,
    },
    ClosePage,
    CloseContext,
    CloseBrowser,
}

impl BridgeRequest<'_> {
    fn name(&self) -> &'static str {
        match self {
            BridgeRequest::Launch { .. } => "launch",
            BridgeRequest::Context => "context",
            BridgeRequest::Page { .. } => "page",
            BridgeRequest::Navigate { .. } => "navigate",
            BridgeRequest::Click { .. } => "click",
            BridgeRequest::Fill { .. } => "fill",
            BridgeRequest::ReadText { .. } => "readText",
            BridgeRequest::IsVisible { .. } => "isVisible",
            BridgeRequest::WaitFor { .. } => "waitFor",
            BridgeRequest::Screenshot { .. } => "screenshot",
            BridgeRequest::ClosePage => "closePage",
            BridgeRequest::CloseContext => "closeContext",
            BridgeRequest::CloseBrowser => "closeBrowser",
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct BridgeResponse {
    status: String,
    message: Option<String>,
    text: Option<String>,
    visible: Option<bool>,
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// One Playwright helper process driving one browser session.
pub struct PlaywrightBridge {
    options: BridgeOptions,
    proc: Mutex<Option<BridgeProcess>>,
}

impl PlaywrightBridge {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            options,
            proc: Mutex::new(None),
        }
    }

    async fn spawn(&self) -> Result<()> {
        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(BRIDGE_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SuiteError::session("bridge stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| SuiteError::session("bridge stdout unavailable"))?;

        *self.proc.lock().await = Some(BridgeProcess {
            child,
            stdin,
            stdout,
        });
        Ok(())
    }

    async fn shutdown(&self) {
        if let Some(mut proc) = self.proc.lock().await.take() {
            // Dropping stdin ends the readline loop; kill covers a wedged helper.
            let _ = proc.child.start_kill();
            let _ = proc.child.wait().await;
        }
    }

    async fn command(&self, request: BridgeRequest<'_>) -> Result<BridgeResponse> {
        let operation = request.name();
        let limit = match &request {
            BridgeRequest::Navigate { .. } => self.options.navigation_timeout,
            _ => self.options.operation_timeout,
        };
        let line = serde_json::to_string(&request)?;

        let mut guard = self.proc.lock().await;
        let proc = guard
            .as_mut()
            .ok_or_else(|| SuiteError::session("bridge process not started"))?;

        let exchange = async {
            proc.stdin.write_all(line.as_bytes()).await?;
            proc.stdin.write_all(b"\n").await?;
            proc.stdin.flush().await?;

            let mut buf = String::new();
            let n = proc.stdout.read_line(&mut buf).await?;
            if n == 0 {
                return Err(SuiteError::session("bridge closed its output stream"));
            }
            let response: BridgeResponse = serde_json::from_str(buf.trim())?;
            Ok(response)
        };

        let response = timeout(limit, exchange).await.map_err(|_| {
            SuiteError::timeout(operation, format!("no response after {:?}", limit))
        })??;

        if response.status != "ok" {
            return Err(map_bridge_error(operation, response.message));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl PageDriver for PlaywrightBridge {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command(BridgeRequest::Navigate { url }).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.command(BridgeRequest::Click { selector }).await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.command(BridgeRequest::Fill { selector, value }).await?;
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<String> {
        let response = self.command(BridgeRequest::ReadText { selector }).await?;
        Ok(response.text.unwrap_or_default())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let response = self.command(BridgeRequest::IsVisible { selector }).await?;
        Ok(response.visible.unwrap_or(false))
    }

    async fn wait_for(&self, selector: &str) -> Result<()> {
        self.command(BridgeRequest::WaitFor { selector }).await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        let path = path.to_string_lossy();
        self.command(BridgeRequest::Screenshot {
            path: &path,
            full_page,
        })
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionBackend for PlaywrightBridge {
    async fn start_engine(&self) -> Result<()> {
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;
        self.spawn().await?;

        let launch = self
            .command(BridgeRequest::Launch {
                browser: self.options.browser.as_str(),
                headless: self.options.headless,
            })
            .await;
        if let Err(err) = launch {
            self.shutdown().await;
            return Err(err);
        }
        Ok(())
    }

    async fn open_context(&self) -> Result<()> {
        self.command(BridgeRequest::Context).await?;
        Ok(())
    }

    async fn open_page(&self) -> Result<()> {
        self.command(BridgeRequest::Page {
            timeout_ms: self.options.operation_timeout.as_millis() as u64,
            navigation_timeout_ms: self.options.navigation_timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn close_page(&self) -> Result<()> {
        self.command(BridgeRequest::ClosePage).await?;
        Ok(())
    }

    async fn close_context(&self) -> Result<()> {
        self.command(BridgeRequest::CloseContext).await?;
        Ok(())
    }

    async fn close_engine(&self) -> Result<()> {
        let result = self.command(BridgeRequest::CloseBrowser).await.map(|_| ());
        self.shutdown().await;
        result
    }
}

fn map_spawn_error(err: io::Error, command: &str) -> SuiteError {
    if err.kind() == io::ErrorKind::NotFound {
        SuiteError::Config(format!(
            "Unable to spawn Playwright bridge; '{}' was not found on PATH",
            command
        ))
    } else {
        SuiteError::Io(err)
    }
}

fn map_bridge_error(operation: &str, message: Option<String>) -> SuiteError {
    let message = message.unwrap_or_else(|| "no additional details".to_string());
    if message
        .to_ascii_lowercase()
        .contains("cannot find module 'playwright'")
    {
        return SuiteError::Config(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }
    if message.to_ascii_lowercase().contains("timeout") {
        return SuiteError::timeout(operation, message);
    }
    SuiteError::automation(operation, message)
}

/// Ensures Node.js is available on the system.
pub async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            SuiteError::Config(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(SuiteError::Config(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }
    Ok(())
}

/// Ensures the Playwright npm package is installed.
pub async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            SuiteError::Config(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_bridge_error("availability check", Some(stderr.into_owned())));
    }
    Ok(())
}
