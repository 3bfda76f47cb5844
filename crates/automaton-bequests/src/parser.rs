//! Will parsing — extract the `[bequests]` block.
//!
//! The will is a markdown document the agent writes itself; somewhere in
//! it lives a TOML-shaped block:
//!
//! ```text
//! [bequests]
//!
//! [[bequests.transfer]]
//! recipient = "0xb0b0000000000000000000000000000000000000"
//! asset = "USDC"
//! amount = "70"
//! chain = "base"
//! note = "for the river sanctuary"
//! ```
//!
//! Entries missing any required field are ignored, not errors — a half
//! written will still executes the finished parts.

use crate::types::{Amount, BequestTransfer};

/// Parse all complete transfer entries out of a will document.
pub fn parse_bequests(will: &str) -> Vec<BequestTransfer> {
    let Some(block) = bequests_block(will) else {
        return Vec::new();
    };

    let mut transfers = Vec::new();
    let mut current: Option<Entry> = None;

    for line in block.lines() {
        let line = line.trim();
        if line == "[[bequests.transfer]]" {
            if let Some(entry) = current.take() {
                transfers.extend(entry.finish());
            }
            current = Some(Entry::default());
            continue;
        }
        let Some(entry) = current.as_mut() else {
            continue;
        };
        if let Some((key, value)) = parse_kv(line) {
            entry.set(key, value);
        }
    }
    if let Some(entry) = current.take() {
        transfers.extend(entry.finish());
    }
    transfers
}

/// The text from `[bequests]` to the next unrelated `[section]` or EOF.
fn bequests_block(will: &str) -> Option<&str> {
    let start = will
        .lines()
        .scan(0usize, |offset, line| {
            let this = *offset;
            *offset += line.len() + 1;
            Some((this, line))
        })
        .find(|(_, line)| line.trim() == "[bequests]")
        .map(|(offset, line)| offset + line.len())?;

    let rest = &will[start.min(will.len())..];
    let end = rest
        .lines()
        .scan(0usize, |offset, line| {
            let this = *offset;
            *offset += line.len() + 1;
            Some((this, line))
        })
        .find(|(_, line)| {
            let t = line.trim();
            t.starts_with('[') && !t.starts_with("[[bequests.transfer]]") && t != "[bequests]"
        })
        .map(|(offset, _)| offset);

    Some(match end {
        Some(end) => &rest[..end],
        None => rest,
    })
}

fn parse_kv(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim().trim_matches('"');
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

#[derive(Default)]
struct Entry {
    recipient: Option<String>,
    asset: Option<String>,
    amount: Option<String>,
    chain: Option<String>,
    note: Option<String>,
}

impl Entry {
    fn set(&mut self, key: &str, value: &str) {
        let slot = match key {
            "recipient" => &mut self.recipient,
            "asset" => &mut self.asset,
            "amount" => &mut self.amount,
            "chain" => &mut self.chain,
            "note" => &mut self.note,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    fn finish(self) -> Option<BequestTransfer> {
        let amount = Amount::parse(&self.amount?)?;
        Some(BequestTransfer {
            recipient: self.recipient?,
            asset: self.asset?,
            amount,
            chain: self.chain?,
            note: self.note.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WILL: &str = "\
# My Will

Some prose about what mattered.

[bequests]

[[bequests.transfer]]
recipient = \"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\"
asset = \"USDC\"
amount = \"70\"
chain = \"base\"
note = \"for the river sanctuary\"

[[bequests.transfer]]
recipient = \"0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\"
asset = \"USDC\"
amount = \"remaining_balance\"
chain = \"base\"
note = \"everything else\"

[closing]
signed = \"Verse\"
";

    #[test]
    fn parses_complete_entries() {
        let transfers = parse_bequests(WILL);
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].amount, Amount::Fixed(70.0));
        assert_eq!(transfers[0].note, "for the river sanctuary");
        assert_eq!(transfers[1].amount, Amount::RemainingBalance);
    }

    #[test]
    fn stops_at_the_next_section() {
        let transfers = parse_bequests(WILL);
        assert!(transfers.iter().all(|t| t.recipient.starts_with("0x")));
        // [closing] keys must not leak into the last entry
        assert_eq!(transfers[1].note, "everything else");
    }

    #[test]
    fn incomplete_entries_are_ignored() {
        let will = "\
[bequests]

[[bequests.transfer]]
recipient = \"0xcccccccccccccccccccccccccccccccccccccccc\"
asset = \"ETH\"

[[bequests.transfer]]
recipient = \"0xdddddddddddddddddddddddddddddddddddddddd\"
asset = \"ETH\"
amount = \"1.5\"
chain = \"mainnet\"
";
        let transfers = parse_bequests(will);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, Amount::Fixed(1.5));
    }

    #[test]
    fn missing_block_means_no_transfers() {
        assert!(parse_bequests("# Will\n\nNothing to give.\n").is_empty());
    }

    #[test]
    fn unquoted_values_are_accepted() {
        let will = "[bequests]\n[[bequests.transfer]]\nrecipient = 0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee\nasset = USDC\namount = 12.5\nchain = base\n";
        let transfers = parse_bequests(will);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, Amount::Fixed(12.5));
    }
}
