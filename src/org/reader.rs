//! Spreadsheet reader
//!
//! Parses the first sheet of an .xlsx/.xls workbook into an ordered list of
//! `NodeRow` records. Columns are located by header label (Chinese labels as
//! used in the import template, English equivalents accepted). Every field
//! is defaulted and validated before it leaves this module; only parent-name
//! resolution is deferred to the assembler.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use super::{NodeRow, PersonnelMember};
use crate::entity::organization_node::NodeType;
use crate::error::{AppError, AppResult};

/// Column positions resolved from the header row
#[derive(Debug, Default)]
struct ColumnMap {
    level: Option<usize>,
    name: Option<usize>,
    node_type: Option<usize>,
    leader: Option<usize>,
    parent: Option<usize>,
    order: Option<usize>,
    personnel: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[Data]) -> Self {
        let mut map = Self::default();
        for (idx, cell) in header.iter().enumerate() {
            let label = cell_text(cell);
            let Some(label) = label else { continue };
            match label.to_lowercase().as_str() {
                "层级" | "level" => map.level = Some(idx),
                "名称" | "name" => map.name = Some(idx),
                "类型" | "type" => map.node_type = Some(idx),
                "负责人" | "leader" => map.leader = Some(idx),
                "父节点" | "parent" => map.parent = Some(idx),
                "排序" | "order" => map.order = Some(idx),
                "人员" | "personnel" => map.personnel = Some(idx),
                _ => {}
            }
        }
        map
    }
}

/// Parse the first sheet of a workbook into row records
pub fn parse_workbook(path: &Path) -> AppResult<Vec<NodeRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::Validation(format!("无法读取Excel文件: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Validation("Excel文件为空或格式不正确".to_string()))?
        .map_err(|e| AppError::Validation(format!("无法读取Excel文件: {}", e)))?;

    parse_range(&range)
}

/// Parse a cell range (header row first) into row records
pub fn parse_range(range: &Range<Data>) -> AppResult<Vec<NodeRow>> {
    let mut row_iter = range.rows();

    let header = row_iter
        .next()
        .ok_or_else(|| AppError::Validation("Excel文件为空或格式不正确".to_string()))?;
    let columns = ColumnMap::from_header(header);

    let mut rows: Vec<NodeRow> = Vec::new();

    for (idx, cells) in row_iter.enumerate() {
        if is_blank_row(cells) {
            continue;
        }

        let name = text_at(cells, columns.name).unwrap_or_default();
        if name.is_empty() {
            // idx counts data rows, the header occupies spreadsheet row 1
            return Err(AppError::Validation(format!("第{}行：名称为空", idx + 2)));
        }

        // Missing or unparsable level defaults to 0. An omitted level column
        // therefore makes every row a level-0 candidate; validation rejects
        // the batch downstream instead of second-guessing the sheet here.
        let level = int_at(cells, columns.level).unwrap_or(0);
        let node_type = NodeType::from_label(&text_at(cells, columns.node_type).unwrap_or_default());
        let leader_name = text_at(cells, columns.leader);
        let parent_name = text_at(cells, columns.parent).filter(|p| p != "-");
        let order_index = int_at(cells, columns.order).unwrap_or(rows.len() as i32 + 1);
        let personnel = text_at(cells, columns.personnel)
            .and_then(|raw| parse_personnel(&raw));

        rows.push(NodeRow {
            name,
            node_type,
            level,
            order_index,
            leader_name,
            parent_name,
            personnel,
        });
    }

    if rows.is_empty() {
        return Err(AppError::Validation("Excel文件为空或格式不正确".to_string()));
    }

    // Every named parent must exist somewhere in the same batch
    let names: HashSet<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    for row in &rows {
        if let Some(parent) = &row.parent_name {
            if !names.contains(parent.as_str()) {
                return Err(AppError::Validation(format!(
                    "节点\"{}\"的父节点\"{}\"不存在",
                    row.name, parent
                )));
            }
        }
    }

    Ok(rows)
}

/// Parse a personnel cell into an ordered member list.
///
/// Supported formats: "张三:组长,李四:法务", "张三,李四", "张三".
/// Full-width comma/colon are treated as their ASCII equivalents;
/// empty or placeholder ("-") input yields None.
pub fn parse_personnel(raw: &str) -> Option<Vec<PersonnelMember>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }

    let normalized = trimmed.replace('，', ",").replace('：', ":");
    let mut members = Vec::new();

    for segment in normalized.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.split_once(':') {
            Some((name, position)) => {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let position = position.trim();
                members.push(PersonnelMember {
                    name: name.to_string(),
                    position: (!position.is_empty()).then(|| position.to_string()),
                });
            }
            None => members.push(PersonnelMember {
                name: segment.to_string(),
                position: None,
            }),
        }
    }

    if members.is_empty() {
        None
    } else {
        Some(members)
    }
}

fn is_blank_row(cells: &[Data]) -> bool {
    cells.iter().all(|cell| cell_text(cell).is_none())
}

/// Cell rendered as trimmed text; None for empty cells
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::DateTime(_) | Data::Error(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn text_at(cells: &[Data], col: Option<usize>) -> Option<String> {
    cells.get(col?).and_then(cell_text)
}

/// Cell as integer; handles numeric cells and numeric strings
fn int_at(cells: &[Data], col: Option<usize>) -> Option<i32> {
    match cells.get(col?)? {
        Data::Int(i) => Some(*i as i32),
        Data::Float(f) => Some(*f as i32),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
