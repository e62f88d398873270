//! Reply text formatting tests.

use fasilbot::bot::replies;
use fasilbot::store::ReportRecord;

fn report(date: &str, participants: &str, validation: &str, remark: &str) -> ReportRecord {
    ReportRecord {
        date: date.to_owned(),
        participants: participants.to_owned(),
        validation: validation.to_owned(),
        remark: remark.to_owned(),
        owner: "Ayu".to_owned(),
    }
}

#[test]
fn greeting_mentions_registration_only_when_new() {
    assert_eq!(
        replies::greeting("Ayu", true),
        "Halo Ayu! Kamu sudah terdaftar sebagai fasilitator."
    );
    assert_eq!(replies::greeting("Ayu", false), "Halo Ayu!");
}

#[test]
fn report_list_has_header_and_one_line_per_record() {
    let text = replies::report_list(
        "Ayu",
        &[
            report("2024-05-01", "12", "Valid", "Lancar"),
            report("2024-05-03", "8", "Pending", "Hujan"),
        ],
    );
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "\u{1F4CA} Laporan kamu (Ayu):");
    assert_eq!(
        lines[1],
        "2024-05-01: 12 peserta, Validasi: Valid, Keterangan: Lancar"
    );
    assert_eq!(
        lines[2],
        "2024-05-03: 8 peserta, Validasi: Pending, Keterangan: Hujan"
    );
}

#[test]
fn no_reports_names_the_owner() {
    assert_eq!(replies::no_reports("Citra"), "Belum ada laporan untuk Citra");
}

#[test]
fn recap_started_names_the_facilitator() {
    assert!(replies::recap_started("Budi").contains("Budi"));
}
