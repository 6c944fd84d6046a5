//! iptables rules used to cut a node off from its peers.
//!
//! Every rule has a symmetric delete: healing a partition issues `-D` for
//! exactly the rules `-I` inserted, so apply-then-heal leaves the table as it
//! was.

use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Drop packets arriving from the peer (`INPUT -s`).
    Inbound,
    /// Drop packets sent to the peer (`OUTPUT -d`).
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOp {
    Insert,
    Delete,
}

impl RuleOp {
    fn flag(self) -> &'static str {
        match self {
            RuleOp::Insert => "-I",
            RuleOp::Delete => "-D",
        }
    }
}

/// A DROP rule against one peer in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirewallRule {
    pub direction: Direction,
    pub peer: IpAddr,
}

impl FirewallRule {
    pub fn inbound(peer: IpAddr) -> Self {
        Self { direction: Direction::Inbound, peer }
    }

    pub fn outbound(peer: IpAddr) -> Self {
        Self { direction: Direction::Outbound, peer }
    }

    pub fn add_command(&self) -> String {
        self.command(RuleOp::Insert)
    }

    pub fn delete_command(&self) -> String {
        self.command(RuleOp::Delete)
    }

    fn command(&self, op: RuleOp) -> String {
        let binary = if self.peer.is_ipv6() { "ip6tables" } else { "iptables" };
        let (chain, flag) = match self.direction {
            Direction::Inbound => ("INPUT", "-s"),
            Direction::Outbound => ("OUTPUT", "-d"),
        };
        format!("sudo {binary} {} {chain} {flag} {} -j DROP", op.flag(), self.peer)
    }
}

impl fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Inbound => write!(f, "drop from {}", self.peer),
            Direction::Outbound => write!(f, "drop to {}", self.peer),
        }
    }
}

/// A firewall command recognised by `FirewallCommand::parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirewallCommand {
    pub op: RuleOp,
    pub rule: FirewallRule,
}

impl FirewallCommand {
    /// Parse a command produced by `FirewallRule::add_command` or
    /// `delete_command`. Returns `None` for anything else.
    pub fn parse(command: &str) -> Option<FirewallCommand> {
        let words: Vec<&str> = command.split_whitespace().collect();
        let words = match words.first() {
            Some(&"sudo") => &words[1..],
            _ => &words[..],
        };
        let [binary, flag, chain, addr_flag, peer, "-j", "DROP"] = words else {
            return None;
        };
        if *binary != "iptables" && *binary != "ip6tables" {
            return None;
        }
        let op = match *flag {
            "-I" | "-A" => RuleOp::Insert,
            "-D" => RuleOp::Delete,
            _ => return None,
        };
        let direction = match (*chain, *addr_flag) {
            ("INPUT", "-s") => Direction::Inbound,
            ("OUTPUT", "-d") => Direction::Outbound,
            _ => return None,
        };
        let peer = peer.parse().ok()?;
        Some(FirewallCommand { op, rule: FirewallRule { direction, peer } })
    }
}

/// Rules isolating `target` from each of its peers in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub target: IpAddr,
    pub rules: Vec<FirewallRule>,
}

impl Partition {
    /// Block inbound-from and outbound-to every peer. The target itself is
    /// skipped if it appears among the peers.
    pub fn between(target: IpAddr, peers: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut rules = Vec::new();
        for peer in peers {
            if peer == target {
                continue;
            }
            let inbound = FirewallRule::inbound(peer);
            if rules.contains(&inbound) {
                continue;
            }
            rules.push(inbound);
            rules.push(FirewallRule::outbound(peer));
        }
        Self { target, rules }
    }

    pub fn peers(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.rules
            .iter()
            .filter(|r| r.direction == Direction::Inbound)
            .map(|r| r.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn add_and_delete_are_symmetric() {
        let rule = FirewallRule::inbound(ip("10.0.0.2"));
        assert_eq!(rule.add_command(), "sudo iptables -I INPUT -s 10.0.0.2 -j DROP");
        assert_eq!(rule.delete_command(), "sudo iptables -D INPUT -s 10.0.0.2 -j DROP");

        let rule = FirewallRule::outbound(ip("10.0.0.3"));
        assert_eq!(rule.add_command(), "sudo iptables -I OUTPUT -d 10.0.0.3 -j DROP");
    }

    #[test]
    fn ipv6_peer_uses_ip6tables() {
        let rule = FirewallRule::outbound(ip("fd00::2"));
        assert_eq!(rule.delete_command(), "sudo ip6tables -D OUTPUT -d fd00::2 -j DROP");
    }

    #[test]
    fn partition_blocks_both_directions_and_skips_target() {
        let p = Partition::between(
            ip("10.0.0.1"),
            [ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3"), ip("10.0.0.2")],
        );
        assert_eq!(p.rules.len(), 4);
        assert_eq!(p.peers().collect::<Vec<_>>(), vec![ip("10.0.0.2"), ip("10.0.0.3")]);
    }

    #[test]
    fn parse_recognises_generated_commands() {
        let rule = FirewallRule::outbound(ip("10.0.0.9"));
        let parsed = FirewallCommand::parse(&rule.delete_command()).unwrap();
        assert_eq!(parsed, FirewallCommand { op: RuleOp::Delete, rule });

        let appended = FirewallCommand::parse("iptables -A INPUT -s 10.0.0.4 -j DROP").unwrap();
        assert_eq!(appended.op, RuleOp::Insert);
        assert_eq!(appended.rule, FirewallRule::inbound(ip("10.0.0.4")));
    }

    #[test]
    fn parse_ignores_other_commands() {
        assert!(FirewallCommand::parse("sudo systemctl stop nginx").is_none());
        assert!(FirewallCommand::parse("sudo iptables -F").is_none());
        assert!(FirewallCommand::parse("sudo iptables -I INPUT -d 10.0.0.1 -j DROP").is_none());
    }
}
