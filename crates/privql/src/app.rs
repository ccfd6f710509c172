//! Line-oriented driver for the privql workflow.
//!
//! Deliberately thin: it renders session state and forwards user intent into
//! privql_core. Every reset, whether typed as a command or as a key chord,
//! goes through the same control-surface path the core defines.

use privql_core::error::PrivqlError;
use privql_core::services::control::{apply, ControlCommand};
use privql_core::services::{
    command_for_chord, Configurator, ConnectionService, ControlHandle, QueryConsole, RpcClient,
};
use privql_core::state::{Phase, Session};

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
commands:
  connect <path>            open the gateway's database connection
  tables                    show the schema and current drafts
  sens <table> <col> <v>    draft a sensitivity value
  budget <table> <v>        draft a table budget
  submit                    submit sensitivities, then budgets
  run <budget> <sql...>     execute budgeted SQL
  retry                     re-execute the retained query inputs
  log                       show the output log
  reset                     discard sensitivities/budgets (also: ctrl+r)
  reset!                    discard the connection (also: ctrl+shift+r)
  help                      show this message
  quit                      exit";

/// The interactive shell around the core workflow objects.
pub struct PrivqlApp {
    session: Arc<Session>,
    gateway: Arc<RpcClient>,
    control: ControlHandle,
    configurator: Configurator,
    console: QueryConsole,
}

impl PrivqlApp {
    pub fn new(session: Arc<Session>, gateway: Arc<RpcClient>, control: ControlHandle) -> Self {
        Self {
            session,
            gateway,
            control,
            configurator: Configurator::new(),
            console: QueryConsole::new(),
        }
    }

    /// Read-eval loop until EOF or `quit`.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        println!("privql - type 'help' for commands");
        loop {
            stdout.write_all(format!("{}> ", self.session.phase()).as_bytes()).await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line == "quit" || line == "exit" {
                return Ok(());
            }
            self.dispatch(&line).await;
        }
    }

    async fn dispatch(&mut self, line: &str) {
        // Key chords arrive as their textual form and go through the
        // always-registered control handle, exactly like a real binding.
        if let Some(command) = command_for_chord(line) {
            self.control.trigger_chord(line);
            self.forget_local_drafts_for(command);
            return;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();

        let result = match command {
            "help" => {
                println!("{HELP}");
                Ok(())
            }
            "connect" => self.connect(rest).await,
            "tables" => self.show_tables(),
            "sens" => self.set_sensitivity(rest),
            "budget" => self.set_budget(rest),
            "submit" => self.submit().await,
            "run" => self.run_query(rest).await,
            "retry" => self.retry().await,
            "log" => self.show_log(),
            "reset" => {
                apply(&self.session, self.gateway.as_ref(), ControlCommand::ResetSensitivities)
                    .await;
                self.forget_local_drafts_for(ControlCommand::ResetSensitivities);
                Ok(())
            }
            "reset!" => {
                apply(&self.session, self.gateway.as_ref(), ControlCommand::ResetConnection).await;
                self.forget_local_drafts_for(ControlCommand::ResetConnection);
                Ok(())
            }
            _ => {
                println!("unknown command '{command}'; type 'help'");
                Ok(())
            }
        };

        if let Err(e) = result {
            let info = e.to_error_info();
            println!("{}: {}", info.error_type, info.message);
            if let Some(hint) = info.hint {
                println!("  hint: {hint}");
            }
        }
    }

    fn forget_local_drafts_for(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::ResetSensitivities => self.configurator.clear_values(),
            ControlCommand::ResetConnection => {
                self.configurator.reset();
                self.console = QueryConsole::new();
            }
        }
    }

    async fn connect(&mut self, path: &str) -> Result<(), PrivqlError> {
        match self.session.phase() {
            Phase::Disconnected => {}
            // Connected but the snapshot fetch failed earlier: retry it.
            Phase::Connected if !self.configurator.is_loaded() => {
                self.configurator.load_schema(self.gateway.as_ref()).await?;
                self.announce_schema();
                return Ok(());
            }
            _ => {
                println!("already connected; use reset! first");
                return Ok(());
            }
        }

        if let Some(message) =
            ConnectionService::connect(&self.session, self.gateway.as_ref(), path).await?
        {
            println!("{message}");
            // One schema snapshot per connection.
            self.configurator.load_schema(self.gateway.as_ref()).await?;
            self.announce_schema();
        }
        Ok(())
    }

    fn announce_schema(&self) {
        println!(
            "loaded {} table(s); set sensitivities, then submit",
            self.configurator.tables().len()
        );
    }

    fn show_tables(&self) -> Result<(), PrivqlError> {
        if !self.configurator.is_loaded() {
            println!("no schema loaded");
            return Ok(());
        }
        for table in self.configurator.tables() {
            let budget = self.configurator.budget(&table.name).unwrap_or("");
            println!("{} (budget: {:?})", table.name, budget);
            for column in &table.columns {
                let cell = self.configurator.cell(&table.name, &column.name).unwrap_or("");
                println!("  {} {} (sensitivity: {:?})", column.name, column.data_type, cell);
            }
        }
        Ok(())
    }

    fn set_sensitivity(&mut self, rest: &str) -> Result<(), PrivqlError> {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        match parts.as_slice() {
            [table, column, value] => self.configurator.set_cell(table, column, *value),
            [table, column] => self.configurator.set_cell(table, column, ""),
            _ => {
                println!("usage: sens <table> <column> <value>");
                Ok(())
            }
        }
    }

    fn set_budget(&mut self, rest: &str) -> Result<(), PrivqlError> {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        match parts.as_slice() {
            [table, value] => self.configurator.set_budget(table, *value),
            [table] => self.configurator.set_budget(table, ""),
            _ => {
                println!("usage: budget <table> <value>");
                Ok(())
            }
        }
    }

    async fn submit(&mut self) -> Result<(), PrivqlError> {
        if self.session.phase() != Phase::Connected {
            println!("submit is only available while connected");
            return Ok(());
        }
        if self.configurator.submit(&self.session, self.gateway.as_ref()).await? {
            println!("sensitivities and budgets accepted; ready for queries");
        }
        Ok(())
    }

    async fn run_query(&mut self, rest: &str) -> Result<(), PrivqlError> {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let budget = parts.next().unwrap_or_default();
        let sql = parts.next().unwrap_or_default();
        self.console.set_budget(budget);
        self.console.set_sql(sql);
        self.retry().await
    }

    async fn retry(&mut self) -> Result<(), PrivqlError> {
        if self.session.phase() != Phase::SensitivitiesSet {
            println!("queries are only available once sensitivities are set");
            return Ok(());
        }
        if let Some(entry) = self.console.execute(&self.session, self.gateway.as_ref()).await? {
            println!("{}", entry.render());
        }
        Ok(())
    }

    fn show_log(&self) -> Result<(), PrivqlError> {
        let output = self.session.output();
        if output.is_empty() {
            println!("output log is empty");
        }
        for entry in output {
            println!("{}", entry.render());
        }
        Ok(())
    }
}
