
/// Number of columns in a feed line:
/// `datum;tag;warengruppe;name;kennz;preis;stud;bed;gast`
pub const FIELD_COUNT: usize = 9;

/// Decodes a body labelled ISO-8859-1. Browsers read that label as
/// windows-1252, which puts `€ „ “ –` at 0x80..=0x9F.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RawRowError {
    #[error("expected {FIELD_COUNT} fields, found {found}")]
    TooFewFields { found: usize },
}

/// One line of the feed, split into its positional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRow<'a> {
    /// `DD.MM.YYYY`
    pub datum: &'a str,
    pub tag: &'a str,
    pub warengruppe: &'a str,
    /// dish name, may end in a label list like `(1,2,Gf)`
    pub name: &'a str,
    // label codes again, already part of `name`
    pub kennz: &'a str,
    // display price, unused
    pub preis: &'a str,
    pub stud: &'a str,
    pub bed: &'a str,
    pub gast: &'a str,
}

impl<'a> RawRow<'a> {
    pub fn split(line: &'a str) -> Result<Self, RawRowError> {
        let fields: Vec<&str> = line.split(';').collect();
        let [datum, tag, warengruppe, name, kennz, preis, stud, bed, gast, ref rest @ ..] =
            *fields.as_slice()
        else {
            return Err(RawRowError::TooFewFields { found: fields.len() });
        };

        if !rest.is_empty() {
            tracing::debug!("ignoring {} extra fields in '{line}'", rest.len());
        }

        Ok(Self {
            datum, tag, warengruppe, name,
            kennz, preis, stud, bed, gast,
        })
    }

    /// `DD.MM.YYYY` rewritten to `YYYY-MM-DD`.
    pub fn iso_date(&self) -> Option<String> {
        let mut parts = self.datum.trim().split('.');
        let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() { return None; }

        Some(format!("{year}-{month}-{day}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_positional_fields() {
        let row = RawRow::split("01.03.2024;Freitag;Suppe;Erbsensuppe (1,2,Gf);;3,50;1,20;2,50;3,80")
            .unwrap();

        assert_eq!(row.datum, "01.03.2024");
        assert_eq!(row.tag, "Freitag");
        assert_eq!(row.warengruppe, "Suppe");
        assert_eq!(row.name, "Erbsensuppe (1,2,Gf)");
        assert_eq!(row.kennz, "");
        assert_eq!(row.preis, "3,50");
        assert_eq!((row.stud, row.bed, row.gast), ("1,20", "2,50", "3,80"));
    }

    #[test]
    fn short_line_is_rejected() {
        assert_eq!(
            RawRow::split("01.03.2024;Freitag;Suppe"),
            Err(RawRowError::TooFewFields { found: 3 }),
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let row = RawRow::split("01.03.2024;Fr;S;Reis;;1;2;3;4;x;y").unwrap();
        assert_eq!(row.gast, "4");
    }

    #[test]
    fn rewrites_date() {
        let row = RawRow::split("01.03.2024;Fr;S;Reis;;;;;").unwrap();
        assert_eq!(row.iso_date().as_deref(), Some("2024-03-01"));

        let row = RawRow::split("2024-03-01;Fr;S;Reis;;;;;").unwrap();
        assert_eq!(row.iso_date(), None);
    }

    #[test]
    fn decodes_windows_1252_punctuation() {
        assert_eq!(decode_latin1(b"\x84Tagesangebot\x93 \x80 \x96 2,50"), "„Tagesangebot“ € – 2,50");
    }

    #[test]
    fn decodes_latin1() {
        // "Gemüse" and "Würstchen" as published upstream
        let bytes = b"Gem\xfcse;W\xfcrstchen \xe0 la cr\xe8me";
        assert_eq!(decode_latin1(bytes), "Gemüse;Würstchen à la crème");
    }
}
