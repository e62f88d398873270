//! User-facing reply texts.
//!
//! Replies are plain text (no parse mode) because chat replies are relayed
//! verbatim from the completion provider.

use crate::store::ReportRecord;

/// Sent when a command needs a registered identity and there is none.
pub const NOT_REGISTERED: &str =
    "Kamu belum terdaftar! Silakan kirim pesan apapun dulu untuk auto-register.";

/// Sent when a recap or store call fails.
pub const TRY_AGAIN_LATER: &str =
    "Maaf, permintaan kamu belum bisa diproses saat ini. Silakan coba lagi nanti ya.";

/// Sent when the completion provider fails.
pub const CHAT_FAILURE: &str =
    "Mohon maaf, FasilBot sedang mengalami kendala dan belum bisa menjawab. Silakan coba lagi nanti.";

/// Sent when an inbound message has no text.
pub const EMPTY_MESSAGE: &str = "Silakan kirim pesan teks ya.";

/// Greeting after `/start`.
pub fn greeting(name: &str, newly_registered: bool) -> String {
    if newly_registered {
        format!("Halo {name}! Kamu sudah terdaftar sebagai fasilitator.")
    } else {
        format!("Halo {name}!")
    }
}

/// Neutral reply when the owner has no reports.
pub fn no_reports(owner: &str) -> String {
    format!("Belum ada laporan untuk {owner}")
}

/// Render the report list, one line per record.
pub fn report_list(owner: &str, reports: &[ReportRecord]) -> String {
    let lines = reports
        .iter()
        .map(|r| {
            format!(
                "{}: {} peserta, Validasi: {}, Keterangan: {}",
                r.date, r.participants, r.validation, r.remark
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("\u{1F4CA} Laporan kamu ({owner}):\n{lines}")
}

/// Confirmation after the recap endpoint accepted the request.
pub fn recap_started(name: &str) -> String {
    format!("\u{2705} Permintaan rekap capaian untuk {name} sudah dikirim. Hasilnya akan segera dikirimkan.")
}
