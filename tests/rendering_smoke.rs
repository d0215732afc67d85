use std::sync::Arc;

use chatframe::rendering::{layout_transcript, normalize_for_export, CellFace, Rasterizer, SoftwareRasterizer};
use chatframe::{ExportConfig, Message, Role};

#[test]
fn smoke_rasterize_normalized_transcript() {
    let cfg = ExportConfig::default();
    let messages = vec![
        Message { role: Role::User, content: "ping".into() },
        Message { role: Role::Assistant, content: "pong".into() },
    ];
    let mut tree = layout_transcript(&messages, 1080, &cfg.layout, &cfg.theme, &CellFace);
    normalize_for_export(&mut tree, &cfg.palette);

    let img = SoftwareRasterizer::new(Arc::new(CellFace))
        .rasterize(&tree, 1080, 2.0)
        .expect("rasterize");
    assert_eq!(img.width(), 1080);
    assert_eq!(img.height(), tree.height);

    let pixels: Vec<[u8; 4]> = img.pixels().map(|p| p.0).collect();
    // export palette: page background, user tint, assistant bubble, text
    for expected in [[0xF9, 0xFA, 0xFB, 255], [0xEF, 0xF6, 0xFF, 255], [0xF3, 0xF4, 0xF6, 255], [0x11, 0x18, 0x27, 255]] {
        assert!(pixels.contains(&expected), "missing {:?}", expected);
    }
}

#[test]
fn smoke_live_tree_is_not_rasterizable() {
    let cfg = ExportConfig::default();
    let messages = vec![
        Message { role: Role::User, content: "ping".into() },
        Message { role: Role::Assistant, content: "pong".into() },
    ];
    let tree = layout_transcript(&messages, 1080, &cfg.layout, &cfg.theme, &CellFace);
    assert!(SoftwareRasterizer::new(Arc::new(CellFace)).rasterize(&tree, 1080, 2.0).is_err());
}
