/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Element database
//!
//! Element symbols and covalent radii (Å) indexed by atomic number. The
//! radii are used for bond detection when assigning aspherical atom types.

/// (symbol, covalent radius in Å), index = atomic number - 1
const ELEMENTS: [(&str, f64); 96] = [
    ("H", 0.31), ("He", 0.28), ("Li", 1.28), ("Be", 0.96), ("B", 0.84),
    ("C", 0.76), ("N", 0.71), ("O", 0.66), ("F", 0.57), ("Ne", 0.58),
    ("Na", 1.66), ("Mg", 1.41), ("Al", 1.21), ("Si", 1.11), ("P", 1.07),
    ("S", 1.05), ("Cl", 1.02), ("Ar", 1.06), ("K", 2.03), ("Ca", 1.76),
    ("Sc", 1.70), ("Ti", 1.60), ("V", 1.53), ("Cr", 1.39), ("Mn", 1.39),
    ("Fe", 1.32), ("Co", 1.26), ("Ni", 1.24), ("Cu", 1.32), ("Zn", 1.22),
    ("Ga", 1.22), ("Ge", 1.20), ("As", 1.19), ("Se", 1.20), ("Br", 1.20),
    ("Kr", 1.16), ("Rb", 2.20), ("Sr", 1.95), ("Y", 1.90), ("Zr", 1.75),
    ("Nb", 1.64), ("Mo", 1.54), ("Tc", 1.47), ("Ru", 1.46), ("Rh", 1.42),
    ("Pd", 1.39), ("Ag", 1.45), ("Cd", 1.44), ("In", 1.42), ("Sn", 1.39),
    ("Sb", 1.39), ("Te", 1.38), ("I", 1.39), ("Xe", 1.40), ("Cs", 2.44),
    ("Ba", 2.15), ("La", 2.07), ("Ce", 2.04), ("Pr", 2.03), ("Nd", 2.01),
    ("Pm", 1.99), ("Sm", 1.98), ("Eu", 1.98), ("Gd", 1.96), ("Tb", 1.94),
    ("Dy", 1.92), ("Ho", 1.92), ("Er", 1.89), ("Tm", 1.90), ("Yb", 1.87),
    ("Lu", 1.87), ("Hf", 1.75), ("Ta", 1.70), ("W", 1.62), ("Re", 1.51),
    ("Os", 1.44), ("Ir", 1.41), ("Pt", 1.36), ("Au", 1.36), ("Hg", 1.32),
    ("Tl", 1.45), ("Pb", 1.46), ("Bi", 1.48), ("Po", 1.40), ("At", 1.50),
    ("Rn", 1.50), ("Fr", 2.60), ("Ra", 2.21), ("Ac", 2.15), ("Th", 2.06),
    ("Pa", 2.00), ("U", 1.96), ("Np", 1.90), ("Pu", 1.87), ("Am", 1.80),
    ("Cm", 1.69),
];

/// Provides element symbols for atomic numbers
pub fn element_symbol(atomic_number: i32) -> Option<&'static str> {
    if atomic_number < 1 {
        return None;
    }
    ELEMENTS
        .get(atomic_number as usize - 1)
        .map(|(symbol, _)| *symbol)
}

/// Covalent radius in Å
pub fn covalent_radius(atomic_number: i32) -> Option<f64> {
    if atomic_number < 1 {
        return None;
    }
    ELEMENTS
        .get(atomic_number as usize - 1)
        .map(|(_, radius)| *radius)
}

/// Look up the atomic number of an element symbol, case-insensitively
pub fn atomic_number_from_symbol(symbol: &str) -> Option<i32> {
    let symbol = symbol.trim();
    ELEMENTS
        .iter()
        .position(|(s, _)| s.eq_ignore_ascii_case(symbol))
        .map(|index| index as i32 + 1)
}

/// Extract the element symbol from a site label
///
/// Handles labels such as `"C12"`, `"Fe2"` and `"Cl1A"`. A two-letter
/// symbol is only read when its second letter is lowercase, so `"CA1"` is
/// a carbon and `"HO1"` a hydrogen.
pub fn element_from_label(label: &str) -> Option<&'static str> {
    let mut chars = label.trim().chars();
    let first = chars.next().filter(char::is_ascii_alphabetic)?;
    if let Some(second) = chars.next().filter(char::is_ascii_lowercase) {
        let pair: String = [first, second].iter().collect();
        if let Some(z) = atomic_number_from_symbol(&pair) {
            return element_symbol(z);
        }
    }
    atomic_number_from_symbol(&first.to_string()).and_then(element_symbol)
}

/// Extract the element symbol from a scattering type such as `"Fe2+"`,
/// `"FE++"` or `"o1-"`
///
/// Types carry no site numbering, so the symbol is matched in any case and
/// two-letter symbols take precedence over one-letter ones.
pub fn element_from_type(scattering_type: &str) -> Option<&'static str> {
    let letters: String = scattering_type
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();

    if letters.len() == 2 {
        if let Some(z) = atomic_number_from_symbol(&letters) {
            return element_symbol(z);
        }
    }
    letters
        .get(0..1)
        .and_then(atomic_number_from_symbol)
        .and_then(element_symbol)
}
