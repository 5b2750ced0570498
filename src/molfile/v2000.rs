use log::{trace, warn};

use super::{column, parse_number, AtomKind, Ctab, CtabAtom, CtabBond, Lines, MolfileError, MolfileResult, Topology};

/// Atom block charge codes. 4 is a doublet radical and carries no charge.
fn charge_from_code(code: u8) -> Option<i8> {
    match code {
        0 | 4 => Some(0),
        1 => Some(3),
        2 => Some(2),
        3 => Some(1),
        5 => Some(-1),
        6 => Some(-2),
        7 => Some(-3),
        _ => None,
    }
}

fn topology_from_code(code: u8, line: usize) -> MolfileResult<Topology> {
    match code {
        0 => Ok(Topology::Either),
        1 => Ok(Topology::Ring),
        2 => Ok(Topology::Chain),
        other => Err(MolfileError::parse(line, format!("invalid bond topology {other}"))),
    }
}

fn optional_number<T: std::str::FromStr + Default>(field: &str, line: usize, what: &str) -> MolfileResult<T> {
    if field.is_empty() {
        Ok(T::default())
    } else {
        parse_number(field, line, what)
    }
}

pub(super) fn read_ctab(counts: &str, lines: &mut Lines<'_>) -> MolfileResult<Ctab> {
    let counts_line = lines.line_number();
    let atom_count: usize = parse_number(column(counts, 0, 3), counts_line, "atom count")?;
    let bond_count: usize = parse_number(column(counts, 3, 3), counts_line, "bond count")?;

    let mut ctab = Ctab::default();
    for _ in 0..atom_count {
        let line = lines.require("atom line")?;
        ctab.atoms.push(read_atom(line, lines.line_number())?);
    }
    for _ in 0..bond_count {
        let line = lines.require("bond line")?;
        ctab.bonds.push(read_bond(line, lines.line_number())?);
    }
    read_properties(&mut ctab, lines)?;
    Ok(ctab)
}

fn read_atom(line: &str, line_number: usize) -> MolfileResult<CtabAtom> {
    let symbol = column(line, 31, 3);
    if symbol.is_empty() {
        return Err(MolfileError::parse(line_number, "missing atom symbol"));
    }
    let kind = if symbol == "L" {
        // Filled in by the M  ALS line.
        AtomKind::List {
            elements: Vec::new(),
            negated: false,
        }
    } else {
        AtomKind::from_symbol(symbol, line_number)?
    };
    let code: u8 = optional_number(column(line, 36, 3), line_number, "charge code")?;
    let charge = charge_from_code(code)
        .ok_or_else(|| MolfileError::parse(line_number, format!("invalid charge code {code}")))?;
    Ok(CtabAtom { kind, charge })
}

fn read_bond(line: &str, line_number: usize) -> MolfileResult<CtabBond> {
    let a: usize = parse_number(column(line, 0, 3), line_number, "bond atom")?;
    let b: usize = parse_number(column(line, 3, 3), line_number, "bond atom")?;
    if a == 0 || b == 0 {
        return Err(MolfileError::parse(line_number, "bond atom numbers start at 1"));
    }
    let bond_type = parse_number(column(line, 6, 3), line_number, "bond type")?;
    let topology = optional_number(column(line, 15, 3), line_number, "bond topology")?;
    Ok(CtabBond {
        a: a - 1,
        b: b - 1,
        bond_type,
        topology: topology_from_code(topology, line_number)?,
        line: line_number,
    })
}

fn atom_index(field: &str, ctab: &Ctab, line_number: usize) -> MolfileResult<usize> {
    let n: usize = parse_number(field, line_number, "atom number")?;
    if n == 0 || n > ctab.atoms.len() {
        return Err(MolfileError::parse(line_number, format!("atom number {n} out of range")));
    }
    Ok(n - 1)
}

fn read_properties(ctab: &mut Ctab, lines: &mut Lines<'_>) -> MolfileResult<()> {
    let mut charges_reset = false;
    while let Some(line) = lines.next_line() {
        let line_number = lines.line_number();
        if line.starts_with("M  END") {
            return check_lists(ctab, line_number);
        }
        if line.starts_with("M  CHG") {
            // Any CHG line supersedes every atom block charge.
            if !charges_reset {
                ctab.atoms.iter_mut().for_each(|a| a.charge = 0);
                charges_reset = true;
            }
            let entries: usize = parse_number(column(line, 6, 3), line_number, "entry count")?;
            for i in 0..entries {
                let atom = atom_index(column(line, 9 + 8 * i, 4), ctab, line_number)?;
                let charge: i8 = parse_number(column(line, 13 + 8 * i, 4), line_number, "charge")?;
                ctab.atoms[atom].charge = charge;
            }
        } else if line.starts_with("M  ALS") {
            let atom = atom_index(column(line, 7, 3), ctab, line_number)?;
            let entries: usize = parse_number(column(line, 10, 3), line_number, "entry count")?;
            let negated = column(line, 14, 1) == "T";
            let symbols: Vec<&str> = (0..entries).map(|i| column(line, 16 + 4 * i, 4)).collect();
            ctab.atoms[atom].kind = AtomKind::list(&symbols, negated, line_number)?;
        } else if line.starts_with("M  ") {
            trace!("skipping property line {line_number}: {line}");
        } else {
            warn!("skipping unsupported Molfile line {line_number}: {line}");
        }
    }
    check_lists(ctab, lines.line_number())
}

/// Every `L` atom needs its list.
fn check_lists(ctab: &Ctab, line_number: usize) -> MolfileResult<()> {
    let empty = ctab
        .atoms
        .iter()
        .position(|a| matches!(&a.kind, AtomKind::List { elements, .. } if elements.is_empty()));
    match empty {
        Some(i) => Err(MolfileError::parse(
            line_number,
            format!("atom {} is an atom list without an M  ALS entry", i + 1),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::molfile::{read_query_molfile, MolfileError};
    use crate::smarts::to_smarts;

    #[test]
    fn charge_codes_and_topology() {
        let text = indoc! {"
            codes


              3  2  0  0  0  0  0  0  0  0999 V2000
                0.0000    0.0000    0.0000 N   0  3  0  0  0  0  0  0  0  0  0  0
                1.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
                2.0000    0.0000    0.0000 O   0  5  0  0  0  0  0  0  0  0  0  0
              1  2  1  0  0  1  0
              2  3  2  0  0  2  0
            M  END
        "};
        let query = read_query_molfile(text).unwrap();
        assert_eq!(to_smarts(&query), "[#7&+1]-&@[#6]=&!@[#8&-1]");
    }

    #[test]
    fn atom_list_property() {
        let text = indoc! {"
            list


              2  1  0  0  0  0  0  0  0  0999 V2000
                0.0000    0.0000    0.0000 L   0  0  0  0  0  0  0  0  0  0  0  0
                1.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
              1  2  1  0  0  0  0
            M  ALS   1  3 T C   N   O
            M  END
        "};
        let query = read_query_molfile(text).unwrap();
        assert_eq!(to_smarts(&query), "[!#6&!#7&!#8]-[#6]");
    }

    #[test]
    fn list_atom_without_entries_is_rejected() {
        let text = indoc! {"
            list


              1  0  0  0  0  0  0  0  0  0999 V2000
                0.0000    0.0000    0.0000 L   0  0  0  0  0  0  0  0  0  0  0  0
            M  END
        "};
        assert!(matches!(
            read_query_molfile(text),
            Err(MolfileError::Parse { line: 6, .. })
        ));
    }

    #[test]
    fn unknown_symbol_reports_its_line() {
        let text = indoc! {"
            bad


              1  0  0  0  0  0  0  0  0  0999 V2000
                0.0000    0.0000    0.0000 Xx  0  0  0  0  0  0  0  0  0  0  0  0
            M  END
        "};
        assert!(matches!(
            read_query_molfile(text),
            Err(MolfileError::Parse { line: 5, .. })
        ));
    }

    #[test]
    fn missing_bond_lines_are_unexpected_end() {
        let text = indoc! {"
            short


              2  1  0  0  0  0  0  0  0  0999 V2000
                0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
                1.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
        "};
        assert_eq!(
            read_query_molfile(text),
            Err(MolfileError::UnexpectedEnd { line: 6 })
        );
    }
}
