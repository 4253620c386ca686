//! Ranked, paginated view of the ledger.

use revolt_api::util::mention;

use crate::state::EconomyState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// 1-based, continuous across pages.
    pub rank: usize,
    pub user_id: String,
    pub balance: u64,
}

/// How a page is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub title: String,
    pub currency_name: String,
    pub emoji: String,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub total: usize,
    pub title: String,
    pub lines: Vec<String>,
    /// `Page X/Y`, only when there is more than one page.
    pub footer: Option<String>,
}

impl Page {
    pub fn body(&self) -> String {
        let mut body = self.lines.join("\n");
        if let Some(footer) = &self.footer {
            body.push_str("\n\n");
            body.push_str(footer);
        }
        body
    }
}

/// Every account, highest balance first. Equal balances keep the order in
/// which the accounts were opened.
pub fn rank(state: &EconomyState) -> Vec<Standing> {
    let mut accounts: Vec<_> = state.accounts().collect();
    accounts.sort_by(|(_, a), (_, b)| b.balance.cmp(&a.balance).then(a.opened.cmp(&b.opened)));
    accounts
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, account))| Standing {
            rank: i + 1,
            user_id: user_id.to_string(),
            balance: account.balance,
        })
        .collect()
}

pub fn render(state: &EconomyState, style: &Style) -> Vec<Page> {
    let standings = rank(state);
    if standings.is_empty() {
        return vec![Page {
            number: 1,
            total: 1,
            title: style.title.clone(),
            lines: vec![format!("No one has any {} yet!", style.currency_name)],
            footer: None,
        }];
    }

    let page_size = style.page_size.max(1);
    let total = standings.len().div_ceil(page_size);
    standings
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| Page {
            number: i + 1,
            total,
            title: style.title.clone(),
            lines: chunk
                .iter()
                .map(|s| {
                    format!(
                        "**{}.** {} - {} {}",
                        s.rank,
                        mention(&s.user_id),
                        s.balance,
                        style.emoji
                    )
                })
                .collect(),
            footer: (total > 1).then(|| format!("Page {}/{}", i + 1, total)),
        })
        .collect()
}
