use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;

use parking_lot::Mutex;
use vigil_net::{BoxFuture, CommandOutput, FirewallCommand, FirewallRule, NetError, Remote, RuleOp};

/// In-memory `Remote` for tests.
///
/// Interprets the commands fault injection issues: iptables rules go into a
/// simulated table, `systemctl stop/start` flips unit state, and `shutdown`
/// powers the host off (every later command fails as a disconnect). Other
/// commands answer from scripted responses matched by substring.
pub struct TestRemote {
    host: IpAddr,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    rules: Vec<FirewallRule>,
    units: HashMap<String, bool>,
    responses: Vec<(String, VecDeque<CommandOutput>)>,
    history: Vec<String>,
    resets: usize,
    reachable: bool,
    powered_off: bool,
}

impl TestRemote {
    pub fn new(host: IpAddr) -> Self {
        Self { host, state: Mutex::new(State { reachable: true, ..Default::default() }) }
    }

    /// Answer commands containing `pattern` with `stdout` and exit 0.
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.respond_seq(
            pattern,
            vec![CommandOutput { stdout: stdout.to_owned(), ..Default::default() }],
        );
    }

    /// Answer commands containing `pattern` with each output in turn; the
    /// last one repeats. Later registrations shadow earlier ones.
    pub fn respond_seq(&self, pattern: &str, outputs: Vec<CommandOutput>) {
        let mut state = self.state.lock();
        state.responses.retain(|(p, _)| p != pattern);
        state.responses.insert(0, (pattern.to_owned(), outputs.into()));
    }

    /// Fail commands containing `pattern` with exit `code` and `stderr`.
    pub fn fail(&self, pattern: &str, code: i32, stderr: &str) {
        self.respond_seq(
            pattern,
            vec![CommandOutput { stderr: stderr.to_owned(), code, ..Default::default() }],
        );
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    /// Bring a powered-off host back with all units running.
    pub fn power_on(&self) {
        let mut state = self.state.lock();
        state.powered_off = false;
        state.units.values_mut().for_each(|running| *running = true);
    }

    pub fn is_powered_off(&self) -> bool {
        self.state.lock().powered_off
    }

    /// Current firewall rules, top of chain first.
    pub fn rules(&self) -> Vec<FirewallRule> {
        self.state.lock().rules.clone()
    }

    /// `None` if the unit was never touched.
    pub fn unit_running(&self, unit: &str) -> Option<bool> {
        self.state.lock().units.get(unit).copied()
    }

    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().resets
    }

    fn exec_sync(&self, command: &str) -> Result<CommandOutput, NetError> {
        let mut state = self.state.lock();
        if !state.reachable || state.powered_off {
            return Err(NetError::Disconnected {
                host: self.host,
                message: "Connection timed out".to_owned(),
            });
        }
        state.history.push(command.to_owned());

        if let Some(cmd) = FirewallCommand::parse(command) {
            return Ok(apply_rule(&mut state.rules, cmd));
        }
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["sudo", "systemctl", action @ ("stop" | "start"), unit] => {
                state.units.insert((*unit).to_owned(), *action == "start");
                return Ok(CommandOutput::default());
            }
            ["sudo", "shutdown", ..] => {
                state.powered_off = true;
                state.units.values_mut().for_each(|running| *running = false);
                return Err(NetError::Disconnected {
                    host: self.host,
                    message: "Connection closed by remote host".to_owned(),
                });
            }
            _ => {}
        }

        let scripted = state.responses.iter_mut().find(|(p, _)| command.contains(p.as_str()));
        Ok(match scripted {
            Some((_, outputs)) if outputs.len() > 1 => outputs.pop_front().unwrap_or_default(),
            Some((_, outputs)) => outputs.front().cloned().unwrap_or_default(),
            None => CommandOutput::default(),
        })
    }
}

/// iptables semantics: `-I` prepends, `-D` removes the first match and fails
/// when there is none.
fn apply_rule(rules: &mut Vec<FirewallRule>, cmd: FirewallCommand) -> CommandOutput {
    match cmd.op {
        RuleOp::Insert => {
            rules.insert(0, cmd.rule);
            CommandOutput::default()
        }
        RuleOp::Delete => match rules.iter().position(|r| *r == cmd.rule) {
            Some(i) => {
                rules.remove(i);
                CommandOutput::default()
            }
            None => CommandOutput {
                stderr: "iptables: Bad rule (does a matching rule exist in that chain?).".into(),
                code: 1,
                ..Default::default()
            },
        },
    }
}

impl Remote for TestRemote {
    fn host(&self) -> IpAddr {
        self.host
    }

    fn exec<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<CommandOutput, NetError>> {
        Box::pin(std::future::ready(self.exec_sync(command)))
    }

    fn reset(&self) -> BoxFuture<'_, ()> {
        self.state.lock().resets += 1;
        Box::pin(std::future::ready(()))
    }
}
