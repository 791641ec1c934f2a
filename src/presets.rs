//! Preset choices for the constrained prompt fields.
//!
//! Free text is always accepted for these fields. Presets only give the
//! CLI a list to show and a way to pick an entry by number or name.

use std::fmt;

/// One selectable option. `value` is what goes into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub value: &'static str,
    pub label: &'static str,
}

const fn same(value: &'static str) -> Preset {
    Preset {
        value,
        label: value,
    }
}

const fn labeled(value: &'static str, label: &'static str) -> Preset {
    Preset { value, label }
}

pub const TIME: &[Preset] = &[
    same("Dawn (Subuh)"),
    same("Morning (Pagi)"),
    same("Noon (Siang)"),
    same("Afternoon (Sore)"),
    same("Golden Hour (Jam Emas)"),
    same("Sunset (Matahari Terbenam)"),
    same("Dusk (Senja)"),
    same("Night (Malam)"),
    same("Midnight (Tengah Malam)"),
];

pub const LIGHTING: &[Preset] = &[
    same("Natural Light (Cahaya Alami)"),
    same("Cinematic (Sinematik)"),
    same("Studio Lighting (Pencahayaan Studio)"),
    same("Soft Lighting (Cahaya Lembut)"),
    same("Hard Lighting (Cahaya Keras)"),
    same("Volumetric (Volumetrik/Berisi)"),
    same("Neon (Neon)"),
    same("Low Key (Remang)"),
    same("High Key (Terang Benderang)"),
    same("Bioluminescent (Bioluminesensi)"),
];

pub const STYLE: &[Preset] = &[
    same("Realistic (Realistis)"),
    same("Photorealistic (Fotorealistis)"),
    same("Cinematic (Sinematik)"),
    same("Anime (Anime)"),
    same("3D Animation (Animasi 3D)"),
    same("Cyberpunk (Cyberpunk)"),
    same("Vintage Film (Film Jadul)"),
    same("Black & White (Hitam Putih)"),
    same("Oil Painting (Lukisan Minyak)"),
    same("Documentary (Dokumenter)"),
    same("Fantasy (Fantasi)"),
];

pub const MOOD: &[Preset] = &[
    same("Happy (Bahagia)"),
    same("Sad (Sedih)"),
    same("Mysterious (Misterius)"),
    same("Scary/Horror (Menakutkan)"),
    same("Intense/Action (Tegang/Aksi)"),
    same("Romantic (Romantis)"),
    same("Peaceful (Tenang)"),
    same("Dramatic (Dramatis)"),
    same("Dreamy (Mimpi)"),
    same("Melancholic (Melankolis)"),
];

pub const CAMERA: &[Preset] = &[
    labeled("Static", "Static (Diam)"),
    labeled("Pan Left", "Pan Left (Geser Kiri)"),
    labeled("Pan Right", "Pan Right (Geser Kanan)"),
    labeled("Tilt Up", "Tilt Up (Dongak Atas)"),
    labeled("Tilt Down", "Tilt Down (Tunduk Bawah)"),
    labeled("Zoom In", "Zoom In (Perbesar)"),
    labeled("Zoom Out", "Zoom Out (Perkecil)"),
    labeled("Dolly In", "Dolly In (Maju Mendekat)"),
    labeled("Dolly Out", "Dolly Out (Mundur Menjauh)"),
    labeled("Truck Left", "Truck Left (Bergerak Kiri)"),
    labeled("Truck Right", "Truck Right (Bergerak Kanan)"),
    labeled("Pedestal Up", "Pedestal Up (Naik)"),
    labeled("Pedestal Down", "Pedestal Down (Turun)"),
    labeled("3D Rotation", "3D Rotation (Rotasi 3D)"),
    labeled("Orbit", "Orbit (Mengitari)"),
    labeled("Arc Shot", "Arc Shot (Lengkungan)"),
    labeled("Crane Shot", "Crane Shot (Kamera Melayang)"),
    labeled("Handheld", "Handheld (Genggam/Guncang)"),
    labeled("Shake", "Shake (Guncangan)"),
    labeled("Tracking Shot", "Tracking Shot (Mengikuti Objek)"),
    labeled("FPV Drone", "FPV Drone (Drone FPV)"),
    labeled("Hyperlapse", "Hyperlapse (Hyperlapse)"),
    labeled("Slow Motion", "Slow Motion (Gerak Lambat)"),
    labeled("Push In", "Push In (Dorong Masuk)"),
    labeled("Pull Out", "Pull Out (Tarik Keluar)"),
    labeled("Roll Clockwise", "Roll Clockwise (Putar Searah Jarum Jam)"),
    labeled(
        "Roll Counter-Clockwise",
        "Roll Counter-Clockwise (Putar Berlawanan)",
    ),
    labeled("Bullet Time", "Bullet Time (Waktu Peluru/Beku)"),
];

/// Prompt fields that come with a preset list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetCategory {
    Time,
    Camera,
    Lighting,
    Style,
    Mood,
}

impl PresetCategory {
    pub const ALL: [PresetCategory; 5] = [
        PresetCategory::Time,
        PresetCategory::Camera,
        PresetCategory::Lighting,
        PresetCategory::Style,
        PresetCategory::Mood,
    ];

    pub fn options(&self) -> &'static [Preset] {
        match self {
            PresetCategory::Time => TIME,
            PresetCategory::Camera => CAMERA,
            PresetCategory::Lighting => LIGHTING,
            PresetCategory::Style => STYLE,
            PresetCategory::Mood => MOOD,
        }
    }

    /// Resolve user input to a prompt value.
    ///
    /// Accepts a 1-based index into the list, or a case-insensitive match on
    /// the value or the label. Anything else is passed through as free text,
    /// trimmed. Empty input stays empty.
    pub fn resolve(&self, input: &str) -> String {
        let input = input.trim();
        if input.is_empty() {
            return String::new();
        }

        let options = self.options();
        if let Ok(index) = input.parse::<usize>() {
            if let Some(preset) = index.checked_sub(1).and_then(|i| options.get(i)) {
                return preset.value.to_string();
            }
        }

        options
            .iter()
            .find(|p| p.value.eq_ignore_ascii_case(input) || p.label.eq_ignore_ascii_case(input))
            .map(|p| p.value.to_string())
            .unwrap_or_else(|| input.to_string())
    }
}

impl fmt::Display for PresetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PresetCategory::Time => "time",
            PresetCategory::Camera => "camera",
            PresetCategory::Lighting => "lighting",
            PresetCategory::Style => "style",
            PresetCategory::Mood => "mood",
        };
        write!(f, "{}", name)
    }
}
