use std::collections::HashMap;

use log::{trace, warn};

use super::{parse_number, AtomKind, Ctab, CtabAtom, CtabBond, Lines, MolfileError, MolfileResult, Topology};

const PREFIX: &str = "M  V30 ";

/// One `M  V30` record with continuation lines joined.
struct Record {
    text: String,
    line: usize,
}

/// Next `M  V30` record, or `None` at `M  END` or end of input.
fn next_record(lines: &mut Lines<'_>) -> MolfileResult<Option<Record>> {
    let mut text = String::new();
    let mut first_line = None;
    while let Some(raw) = lines.next_line() {
        let line_number = lines.line_number();
        if raw.starts_with("M  END") {
            return match first_line {
                Some(line) => Err(MolfileError::parse(line, "unterminated continuation line")),
                None => Ok(None),
            };
        }
        let Some(body) = raw.strip_prefix(PREFIX) else {
            warn!("skipping non-V30 line {line_number}: {raw}");
            continue;
        };
        first_line.get_or_insert(line_number);
        match body.trim_end().strip_suffix('-') {
            Some(head) => text.push_str(head),
            None => {
                text.push_str(body.trim_end());
                return Ok(Some(Record {
                    text,
                    line: first_line.unwrap_or(line_number),
                }));
            }
        }
    }
    match first_line {
        Some(line) => Err(MolfileError::parse(line, "unterminated continuation line")),
        None => Ok(None),
    }
}

pub(super) fn read_ctab(lines: &mut Lines<'_>) -> MolfileResult<Ctab> {
    let mut ctab = Ctab::default();
    // Atom numbers are explicit in V3000 and need not be contiguous.
    let mut index_of: HashMap<usize, usize> = HashMap::new();
    let mut block: Option<String> = None;

    while let Some(record) = next_record(lines)? {
        let text = record.text.trim();
        if let Some(name) = text.strip_prefix("BEGIN ") {
            block = Some(name.trim().to_string());
            continue;
        }
        if text.starts_with("END ") {
            block = None;
            continue;
        }
        if text.starts_with("COUNTS ") {
            trace!("V3000 counts: {text}");
            continue;
        }
        match block.as_deref() {
            Some("ATOM") => {
                let (number, atom) = read_atom(text, record.line)?;
                if index_of.insert(number, ctab.atoms.len()).is_some() {
                    return Err(MolfileError::parse(record.line, format!("duplicate atom number {number}")));
                }
                ctab.atoms.push(atom);
            }
            Some("BOND") => ctab.bonds.push(read_bond(text, record.line, &index_of)?),
            Some(other) => trace!("skipping {other} record at line {}", record.line),
            None => warn!("skipping V30 record outside a block at line {}: {text}", record.line),
        }
    }
    Ok(ctab)
}

/// `KEY=VALUE` fields after the positional ones.
fn properties<'f, 't: 'f>(fields: &'f [&'t str]) -> impl Iterator<Item = (&'t str, &'t str)> + 'f {
    fields.iter().copied().filter_map(|f| f.split_once('='))
}

fn read_atom_type(field: &str, line: usize) -> MolfileResult<AtomKind> {
    let (negated, rest) = match field.strip_prefix("NOT") {
        Some(rest) => (true, rest),
        None => (false, field),
    };
    match rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(inner) => {
            let symbols: Vec<&str> = inner.split(',').map(str::trim).collect();
            AtomKind::list(&symbols, negated, line)
        }
        None if negated => Err(MolfileError::parse(line, format!("malformed atom list {field:?}"))),
        None => AtomKind::from_symbol(field, line),
    }
}

fn read_atom(text: &str, line: usize) -> MolfileResult<(usize, CtabAtom)> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(MolfileError::parse(line, "atom record needs index, type, coordinates and map"));
    }
    let number = parse_number(fields[0], line, "atom number")?;
    let kind = read_atom_type(fields[1], line)?;
    let mut charge = 0i8;
    for (key, value) in properties(&fields[6..]) {
        if key == "CHG" {
            charge = parse_number(value, line, "charge")?;
        }
    }
    Ok((number, CtabAtom { kind, charge }))
}

fn read_bond(text: &str, line: usize, index_of: &HashMap<usize, usize>) -> MolfileResult<CtabBond> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(MolfileError::parse(line, "bond record needs index, type and two atoms"));
    }
    let bond_type = parse_number(fields[1], line, "bond type")?;
    let atom = |field: &str| -> MolfileResult<usize> {
        let number: usize = parse_number(field, line, "bond atom")?;
        index_of
            .get(&number)
            .copied()
            .ok_or_else(|| MolfileError::parse(line, format!("bond references unknown atom {number}")))
    };
    let a = atom(fields[2])?;
    let b = atom(fields[3])?;
    let mut topology = Topology::Either;
    for (key, value) in properties(&fields[4..]) {
        if key == "TOPO" {
            topology = match value {
                "0" => Topology::Either,
                "1" => Topology::Ring,
                "2" => Topology::Chain,
                other => return Err(MolfileError::parse(line, format!("invalid bond topology {other}"))),
            };
        }
    }
    Ok(CtabBond {
        a,
        b,
        bond_type,
        topology,
        line,
    })
}
