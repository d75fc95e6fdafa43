//! Section Configuration
//!
//! Typed configuration for the overview's table sections. Each table declares
//! its columns (logical field, label, format) in one place; the renderer never
//! reads per-section settings from anywhere else.

use std::collections::BTreeMap;

use super::language::{Label, Message};

/// Default number of history rows rendered per index code.
pub const DEFAULT_HISTORY_ROWS: usize = 10;

/// Identifier for every renderable section of the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionId {
    /// Realtime index quotes.
    RealtimeIndices,
    /// Whole-market fund flow.
    MarketFundFlow,
    /// Shanghai/Shenzhen-Hong Kong Stock Connect fund flow.
    HsgtFundFlow,
    /// Margin account balances.
    MarginAccount,
    /// Historical index series, keyed by index code.
    IndexHistory,
    /// Market activity metrics.
    MarketActivity,
    /// Domestic market insight blob.
    MarketInsight,
    /// Peripheral (overseas) market insight blob.
    PeripheralInsight,
    /// Macro insight blob.
    MacroInsight,
    /// Latest AI reasoning snapshot.
    Reasoning,
}

impl SectionId {
    /// The six table sections, in render order.
    pub const TABLES: [Self; 6] = [
        Self::RealtimeIndices,
        Self::MarketFundFlow,
        Self::HsgtFundFlow,
        Self::MarginAccount,
        Self::IndexHistory,
        Self::MarketActivity,
    ];

    /// The three insight sections, in render order.
    pub const INSIGHTS: [Self; 3] = [
        Self::MarketInsight,
        Self::PeripheralInsight,
        Self::MacroInsight,
    ];

    /// Key of this section in the aggregate payload.
    #[must_use]
    pub const fn payload_key(&self) -> &'static str {
        match self {
            Self::RealtimeIndices => "realtime_indices",
            Self::MarketFundFlow => "market_fund_flow",
            Self::HsgtFundFlow => "hsgt_fund_flow",
            Self::MarginAccount => "margin_account",
            Self::IndexHistory => "index_history",
            Self::MarketActivity => "market_activity",
            Self::MarketInsight => "market_insight",
            Self::PeripheralInsight => "peripheral_insight",
            Self::MacroInsight => "macro_insight",
            Self::Reasoning => "latest_reasoning",
        }
    }

    /// Title of non-table sections.
    #[must_use]
    pub const fn message(&self) -> Option<Message> {
        match self {
            Self::MarketInsight => Some(Message::MarketInsight),
            Self::PeripheralInsight => Some(Message::PeripheralInsight),
            Self::MacroInsight => Some(Message::MacroInsight),
            Self::Reasoning => Some(Message::Reasoning),
            _ => None,
        }
    }
}

/// How a column's resolved value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    /// Scalar shown as text.
    Text,
    /// Number with a fixed number of places.
    Decimal(u32),
    /// Number with a fixed number of places and an explicit sign.
    SignedDecimal(u32),
    /// Signed percent; the value is already in percent units.
    Percent,
    /// Large amount scaled to 万/亿 or K/M/B.
    Amount,
    /// Calendar date.
    Date,
}

/// One column of a table section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Logical field name, underscore spelling.
    pub field: &'static str,
    /// Header label.
    pub label: Label,
    /// Display format.
    pub format: ColumnFormat,
}

impl ColumnSpec {
    const fn new(field: &'static str, en: &'static str, zh: &'static str, format: ColumnFormat) -> Self {
        Self {
            field,
            label: Label::new(en, zh),
            format,
        }
    }
}

/// Configuration of one table section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Section title.
    pub title: Label,
    /// Columns in display order.
    pub columns: Vec<ColumnSpec>,
    /// Row cap; for index history the cap applies per index code.
    pub max_rows: Option<usize>,
}

impl TableSpec {
    /// Number of columns, used to size the "no data" row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Table configuration keyed by section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRegistry {
    tables: BTreeMap<SectionId, TableSpec>,
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self::with_history_rows(DEFAULT_HISTORY_ROWS)
    }
}

impl SectionRegistry {
    /// Build the standard registry with a per-code history row cap.
    #[must_use]
    pub fn with_history_rows(history_rows: usize) -> Self {
        use ColumnFormat::{Amount, Date, Decimal, Percent, SignedDecimal, Text};

        let mut tables = BTreeMap::new();

        tables.insert(
            SectionId::RealtimeIndices,
            TableSpec {
                title: Label::new("Realtime Indices", "实时指数"),
                columns: vec![
                    ColumnSpec::new("code", "Code", "代码", Text),
                    ColumnSpec::new("name", "Name", "名称", Text),
                    ColumnSpec::new("price", "Price", "最新价", Decimal(2)),
                    ColumnSpec::new("change_amount", "Change", "涨跌额", SignedDecimal(2)),
                    ColumnSpec::new("change_pct", "Change %", "涨跌幅", Percent),
                    ColumnSpec::new("amount", "Turnover", "成交额", Amount),
                ],
                max_rows: None,
            },
        );

        tables.insert(
            SectionId::MarketFundFlow,
            TableSpec {
                title: Label::new("Market Fund Flow", "大盘资金流向"),
                columns: vec![
                    ColumnSpec::new("trade_date", "Date", "日期", Date),
                    ColumnSpec::new("main_net_inflow", "Main Net Inflow", "主力净流入", Amount),
                    ColumnSpec::new("main_net_inflow_pct", "Main Net %", "主力净占比", Percent),
                    ColumnSpec::new("super_large_net_inflow", "Super Large", "超大单净流入", Amount),
                    ColumnSpec::new("large_net_inflow", "Large", "大单净流入", Amount),
                    ColumnSpec::new("medium_net_inflow", "Medium", "中单净流入", Amount),
                    ColumnSpec::new("small_net_inflow", "Small", "小单净流入", Amount),
                ],
                max_rows: None,
            },
        );

        tables.insert(
            SectionId::HsgtFundFlow,
            TableSpec {
                title: Label::new("Stock Connect Fund Flow", "沪深港通资金流向"),
                columns: vec![
                    ColumnSpec::new("trade_date", "Date", "日期", Date),
                    ColumnSpec::new("board", "Board", "板块", Text),
                    ColumnSpec::new("direction", "Direction", "资金方向", Text),
                    ColumnSpec::new("net_buy_amount", "Net Buy", "成交净买额", Amount),
                    ColumnSpec::new("net_inflow", "Net Inflow", "资金净流入", Amount),
                    ColumnSpec::new("index_name", "Index", "相关指数", Text),
                    ColumnSpec::new("index_change_pct", "Index %", "指数涨跌幅", Percent),
                ],
                max_rows: None,
            },
        );

        tables.insert(
            SectionId::MarginAccount,
            TableSpec {
                title: Label::new("Margin Accounts", "融资融券"),
                columns: vec![
                    ColumnSpec::new("trade_date", "Date", "日期", Date),
                    ColumnSpec::new("financing_balance", "Financing Balance", "融资余额", Amount),
                    ColumnSpec::new("financing_purchase", "Financing Purchase", "融资买入额", Amount),
                    ColumnSpec::new("securities_lending_balance", "Lending Balance", "融券余额", Amount),
                    ColumnSpec::new("total_balance", "Total Balance", "融资融券余额", Amount),
                ],
                max_rows: None,
            },
        );

        tables.insert(
            SectionId::IndexHistory,
            TableSpec {
                title: Label::new("Index History", "指数历史"),
                columns: vec![
                    ColumnSpec::new("code", "Code", "代码", Text),
                    ColumnSpec::new("trade_date", "Date", "日期", Date),
                    ColumnSpec::new("open", "Open", "开盘", Decimal(2)),
                    ColumnSpec::new("high", "High", "最高", Decimal(2)),
                    ColumnSpec::new("low", "Low", "最低", Decimal(2)),
                    ColumnSpec::new("close", "Close", "收盘", Decimal(2)),
                    ColumnSpec::new("change_pct", "Change %", "涨跌幅", Percent),
                ],
                max_rows: Some(history_rows),
            },
        );

        tables.insert(
            SectionId::MarketActivity,
            TableSpec {
                title: Label::new("Market Activity", "市场活跃度"),
                columns: vec![
                    ColumnSpec::new("item", "Metric", "指标", Text),
                    ColumnSpec::new("value", "Value", "数值", Text),
                ],
                max_rows: None,
            },
        );

        Self { tables }
    }

    /// Configuration for a table section; `None` for non-table sections.
    #[must_use]
    pub fn table(&self, id: SectionId) -> Option<&TableSpec> {
        self.tables.get(&id)
    }

    /// All table sections in render order.
    pub fn tables(&self) -> impl Iterator<Item = (SectionId, &TableSpec)> {
        SectionId::TABLES
            .iter()
            .filter_map(|id| self.tables.get(id).map(|spec| (*id, spec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_section_is_configured() {
        let registry = SectionRegistry::default();
        for id in SectionId::TABLES {
            let spec = registry.table(id).unwrap();
            assert!(spec.column_count() > 0, "{id:?} has no columns");
        }
        assert_eq!(registry.tables().count(), 6);
    }

    #[test]
    fn non_table_sections_have_no_table_spec() {
        let registry = SectionRegistry::default();
        for id in SectionId::INSIGHTS {
            assert!(registry.table(id).is_none());
            assert!(id.message().is_some());
        }
        assert!(registry.table(SectionId::Reasoning).is_none());
    }

    #[test]
    fn history_cap_is_configurable() {
        let registry = SectionRegistry::with_history_rows(3);
        assert_eq!(
            registry.table(SectionId::IndexHistory).unwrap().max_rows,
            Some(3)
        );
    }

    #[test]
    fn fields_use_underscore_spelling() {
        let registry = SectionRegistry::default();
        for (_, spec) in registry.tables() {
            for column in &spec.columns {
                assert!(!column.field.chars().any(char::is_uppercase));
            }
        }
    }
}
