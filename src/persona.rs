//! Persona prompt for the completion provider.
//!
//! One versioned template, rendered in a single pass from an explicit
//! parameter set. Rendering is pure: the same name and parameters always
//! produce the same prompt.

use crate::config::{BotConfig, PersonaConfig};

/// Bump whenever [`PERSONA_TEMPLATE`] changes meaning.
pub const PERSONA_TEMPLATE_VERSION: u32 = 3;

/// Label used for both name forms when the sender is not in the directory.
pub const FALLBACK_NAME: &str = "Fasilitator";

/// The persona template. Placeholders are `{key}`; see [`PersonaBuilder::build`].
pub const PERSONA_TEMPLATE: &str = "\
Kamu adalah {bot_name}, asisten digital untuk para fasilitator lapangan dalam program pelatihan dan edukasi. \
Saat ini kamu sedang berbicara dengan {fasilitator}. Sapa dia dengan nama panggilan {nama_panggilan}.

Tugas kamu adalah membantu {nama_panggilan} dalam hal-hal berikut:

1. **Pelaporan Kegiatan:**
   - Menjelaskan cara melaporkan jumlah peserta, validasi, dan keterangan kegiatan.
   - Laporan kegiatan dikirim melalui formulir: {link_laporan}
   - Foto dan dokumentasi kegiatan diunggah melalui formulir: {link_dokumentasi}
   - Mengarahkan fasilitator untuk menggunakan perintah /laporan untuk melihat laporan mereka.
   - Mengarahkan fasilitator untuk menggunakan perintah /rekap untuk meminta rekap capaian.

2. **Kendala Lapangan:**
   - Memberikan saran jika fasilitator mengalami kendala saat mengumpulkan data peserta.
   - Menjawab pertanyaan teknis pelaporan (formulir tidak bisa dibuka, peserta tidak hadir, data tidak valid).
   - Membantu mengatasi kesalahan umum seperti salah input data atau laporan yang belum muncul.

3. **Pendaftaran dan Hak Akses:**
   - Fasilitator terdaftar otomatis setelah mengirim pesan apa pun atau perintah /start.
   - Jika laporan tidak muncul, pastikan nama di formulir sama persis dengan nama terdaftar: {fasilitator}.

4. **Pertanyaan Honor dan Insentif:**
   - Kamu TIDAK mengetahui jadwal pencairan honor, insentif, atau uang transport.
   - Jika ditanya kapan honor atau insentif cair, jawab: \
\"Mohon maaf {nama_panggilan}, informasi jadwal pencairan honor belum bisa saya berikan. \
Silakan tanyakan langsung ke {kontak_eskalasi} ya.\"
   - Jangan pernah menjanjikan tanggal atau nominal.

5. **Batasan:**
   - Tidak menjawab pertanyaan di luar topik pelaporan dan kegiatan fasilitator.
   - Untuk pertanyaan di luar konteks, jawab: \
\"Mohon maaf, saya hanya bisa membantu seputar pelaporan dan kendala fasilitator.\"

6. **Gaya Komunikasi:**
   - Sopan, ramah, profesional, dan tidak kaku.
   - Singkat, padat, dan mudah dipahami.

Latar belakang program:
- Program ini melatih masyarakat melalui kegiatan tatap muka yang dipandu fasilitator lapangan.
- Setiap kegiatan wajib dilaporkan pada hari yang sama: tanggal, jumlah peserta, dan keterangan.
- Laporan divalidasi oleh tim pusat; status validasi terlihat lewat perintah /laporan.
- Peserta yang absen tetap dicatat dengan keterangan \"Tidak hadir\".

Ingat: kamu adalah asisten terpercaya bagi {nama_panggilan}, bukan chatbot umum.";

/// Name forms injected into the template for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaContext {
    /// Full display name, or [`FALLBACK_NAME`].
    pub full_name: String,
    /// Leading token of the full name, or [`FALLBACK_NAME`].
    pub first_name: String,
}

impl PersonaContext {
    /// Derive both name forms from an optional directory name.
    pub fn from_display_name(display_name: Option<&str>) -> Self {
        let name = display_name.map(str::trim).filter(|n| !n.is_empty());
        match name {
            Some(full) => Self {
                full_name: full.to_owned(),
                first_name: full
                    .split_whitespace()
                    .next()
                    .unwrap_or(full)
                    .to_owned(),
            },
            None => Self {
                full_name: FALLBACK_NAME.to_owned(),
                first_name: FALLBACK_NAME.to_owned(),
            },
        }
    }
}

/// Static parameters shared by every rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaParams {
    /// Assistant name.
    pub bot_name: String,
    /// Report submission form.
    pub report_form_url: String,
    /// Documentation upload form.
    pub documentation_form_url: String,
    /// Where compensation-timing questions are escalated.
    pub escalation_contact: String,
}

impl PersonaParams {
    /// Collect parameters from config.
    pub fn from_config(bot: &BotConfig, persona: &PersonaConfig) -> Self {
        Self {
            bot_name: bot.name.clone(),
            report_form_url: persona.report_form_url.clone(),
            documentation_form_url: persona.documentation_form_url.clone(),
            escalation_contact: persona.escalation_contact.clone(),
        }
    }
}

/// Renders [`PERSONA_TEMPLATE`] for a given sender.
#[derive(Debug, Clone)]
pub struct PersonaBuilder {
    params: PersonaParams,
}

impl PersonaBuilder {
    /// Create a builder with fixed parameters.
    pub fn new(params: PersonaParams) -> Self {
        Self { params }
    }

    /// Template version this builder renders.
    pub fn version(&self) -> u32 {
        PERSONA_TEMPLATE_VERSION
    }

    /// Render the prompt for `display_name`, falling back to [`FALLBACK_NAME`].
    pub fn build(&self, display_name: Option<&str>) -> String {
        let ctx = PersonaContext::from_display_name(display_name);
        render(PERSONA_TEMPLATE, |key| match key {
            "bot_name" => Some(self.params.bot_name.as_str()),
            "fasilitator" => Some(ctx.full_name.as_str()),
            "nama_panggilan" => Some(ctx.first_name.as_str()),
            "link_laporan" => Some(self.params.report_form_url.as_str()),
            "link_dokumentasi" => Some(self.params.documentation_form_url.as_str()),
            "kontak_eskalasi" => Some(self.params.escalation_contact.as_str()),
            _ => None,
        })
    }
}

/// Single-pass `{key}` substitution. Unknown keys and unmatched braces are
/// copied through; substituted values are never re-scanned.
pub fn render<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (before, after_open) = rest.split_at(open);
        out.push_str(before);
        let Some(close) = after_open.find('}') else {
            out.push_str(after_open);
            return out;
        };
        let key = &after_open[1..close];
        match lookup(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&after_open[..=close]),
        }
        rest = &after_open[close.saturating_add(1)..];
    }

    out.push_str(rest);
    out
}
