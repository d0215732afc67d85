//! End-to-end export: refusals, height budget, band placement, live tree isolation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chatframe::rendering::text::CellFace;
use chatframe::rendering::{layout_transcript, NodeKind, Rasterizer, SoftwareRasterizer};
use chatframe::{
    DownloadEmitter, Error, ExportCompositor, ExportConfig, FrameAssetSet, FrameState, Message, RenderTree, Result,
    Role, Session,
};
use image::{Rgba, RgbaImage};

const TOP: [u8; 4] = [200, 0, 0, 255];
const TITLE: [u8; 4] = [0, 200, 0, 255];
const MID: [u8; 4] = [0, 0, 200, 255];
const BOTTOM: [u8; 4] = [200, 200, 0, 255];
const SNAPSHOT: [u8; 4] = [10, 10, 10, 255];

/// Rasterizer stand-in producing a solid snapshot of fixed height.
struct FixedHeight(u32);

impl Rasterizer for FixedHeight {
    fn rasterize(&self, _tree: &RenderTree, width: u32, _scale: f32) -> Result<RgbaImage> {
        Ok(RgbaImage::from_pixel(width, self.0, Rgba(SNAPSHOT)))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<(Vec<u8>, String)>>>);

impl DownloadEmitter for Recorder {
    fn emit(&self, png: &[u8], filename: &str) -> Result<()> {
        self.0.lock().unwrap().push((png.to_vec(), filename.to_string()));
        Ok(())
    }
}

fn frames() -> Arc<FrameAssetSet> {
    Arc::new(FrameAssetSet {
        top: RgbaImage::from_pixel(1080, 100, Rgba(TOP)),
        title: RgbaImage::from_pixel(1080, 80, Rgba(TITLE)),
        mid: RgbaImage::from_pixel(1080, 60, Rgba(MID)),
        bottom: RgbaImage::from_pixel(1080, 120, Rgba(BOTTOM)),
    })
}

fn session_with(snapshot_height: u32) -> (Session, Recorder) {
    let rec = Recorder::default();
    let session = Session::with_rasterizer(
        ExportConfig::default(),
        Arc::new(CellFace),
        Arc::new(FixedHeight(snapshot_height)),
        Box::new(rec.clone()),
    );
    (session, rec)
}

async fn with_frames(session: &mut Session) {
    // Write the frames to disk and go through the real loader.
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("chatframe-export-{}-{}", std::process::id(), n));
    std::fs::create_dir_all(&dir).unwrap();
    let set = frames();
    for (name, img) in [("top.png", &set.top), ("title.png", &set.title), ("mid.png", &set.mid), ("bottom.png", &set.bottom)] {
        img.save(dir.join(name)).unwrap();
    }
    let loader = chatframe::FrameAssetLoader::new(1080).unwrap();
    let sources = chatframe::FramePaths::default().resolve(dir.to_str().unwrap()).unwrap();
    assert!(matches!(session.load_frames(&loader, &sources).await, FrameState::Ready(_)));
    let _ = std::fs::remove_dir_all(&dir);
}

fn add(session: &mut Session, user: &str, assistant: &str) {
    session.set_user_input(user);
    session.set_assistant_input(assistant);
    session.add_pair().unwrap();
}

#[tokio::test]
async fn fitting_transcript_yields_full_size_canvas_with_bands_in_order() {
    let (mut session, rec) = session_with(500);
    with_frames(&mut session).await;
    add(&mut session, "question", "answer");

    let composite = session.compose().await.unwrap().expect("export runs");
    assert_eq!((composite.width(), composite.height()), (1080, 2412));

    let img = composite.image();
    assert_eq!(img.get_pixel(0, 0).0, TOP);
    assert_eq!(img.get_pixel(540, 99).0, TOP);
    assert_eq!(img.get_pixel(540, 100).0, TITLE);
    assert_eq!(img.get_pixel(540, 180).0, SNAPSHOT);
    assert_eq!(img.get_pixel(540, 679).0, SNAPSHOT);
    assert_eq!(img.get_pixel(540, 680).0, MID);
    assert_eq!(img.get_pixel(540, 740).0, [0xF9, 0xFA, 0xFB, 255]);
    assert_eq!(img.get_pixel(540, 2291).0, [0xF9, 0xFA, 0xFB, 255]);
    assert_eq!(img.get_pixel(540, 2292).0, BOTTOM);
    assert_eq!(img.get_pixel(1079, 2411).0, BOTTOM);

    assert!(session.export().await.unwrap());
    let emitted = rec.0.lock().unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].1, "deepseek-chat.png");
    let decoded = image::load_from_memory(&emitted[0].0).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1080, 2412));
}

#[tokio::test]
async fn transcript_filling_the_budget_exactly_still_fits() {
    let (mut session, _) = session_with(2412 - 360);
    with_frames(&mut session).await;
    add(&mut session, "q", "a");
    let composite = session.compose().await.unwrap().unwrap();
    assert_eq!(composite.plan().gap_height, 0);
}

#[tokio::test]
async fn overlong_transcript_reports_both_heights_and_emits_nothing() {
    let (mut session, rec) = session_with(2053);
    with_frames(&mut session).await;
    add(&mut session, "q", "a");

    match session.export().await {
        Err(Error::OverLength { current, max }) => {
            assert_eq!(current, 100 + 80 + 2053 + 60 + 120);
            assert_eq!(max, 2412);
        }
        other => panic!("expected OverLength, got {:?}", other),
    }
    assert!(rec.0.lock().unwrap().is_empty());
    let msg = Error::OverLength { current: 2413, max: 2412 }.to_string();
    assert!(msg.contains("2413") && msg.contains("2412"));
}

#[tokio::test]
async fn empty_store_is_refused_even_with_frames() {
    let (mut session, rec) = session_with(100);
    with_frames(&mut session).await;
    assert!(!session.export().await.unwrap());
    assert!(rec.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn export_before_frames_resolve_is_refused() {
    let (mut session, rec) = session_with(100);
    add(&mut session, "q", "a");
    assert!(matches!(session.frames(), FrameState::Pending));
    assert!(session.compose().await.unwrap().is_none());
    assert!(!session.export().await.unwrap());
    assert!(rec.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn export_leaves_live_tree_styles_untouched() {
    let (mut session, _) = session_with(300);
    with_frames(&mut session).await;
    add(&mut session, "q", "a");
    let before = session.transcript().unwrap().clone();

    session.export().await.unwrap();

    let after = session.transcript().unwrap();
    assert_eq!(&before, after);
    let container = &after.nodes[0];
    assert_eq!(container.kind, NodeKind::Container);
    assert!(container.style.border.is_some());
    assert!(container.style.shadow.is_some());
    let user_bubble = after
        .nodes
        .iter()
        .find(|n| n.kind == NodeKind::Bubble(Role::User))
        .unwrap();
    assert!(!user_bubble.style.background.unwrap().is_raster_safe());
}

#[tokio::test]
async fn real_rasterizer_exports_default_transcript() {
    let rec = Recorder::default();
    let mut session = Session::new(ExportConfig::default(), Arc::new(CellFace), Box::new(rec.clone()));
    with_frames(&mut session).await;
    add(&mut session, "What is the capital of France?", "Paris.");
    assert!(session.export().await.unwrap());

    let png = rec.0.lock().unwrap()[0].0.clone();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (1080, 2412));
    // transcript band starts right after the title and is painted with the
    // export palette, not the live white container
    assert_eq!(img.get_pixel(540, 185).0, [0xF9, 0xFA, 0xFB, 255]);
}

/// Counts rasterize calls and reports the tree height unchanged.
#[derive(Default)]
struct Counting(AtomicUsize);

impl Rasterizer for Counting {
    fn rasterize(&self, tree: &RenderTree, width: u32, _scale: f32) -> Result<RgbaImage> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(RgbaImage::from_pixel(width, tree.height, Rgba(SNAPSHOT)))
    }
}

fn tall_conversation(pairs: usize) -> Vec<Message> {
    (0..pairs)
        .flat_map(|i| {
            [
                Message { role: Role::User, content: format!("q{}", i) },
                Message { role: Role::Assistant, content: format!("a{}", i) },
            ]
        })
        .collect()
}

#[tokio::test]
async fn very_tall_transcript_reports_overlength_not_a_canvas_error() {
    let cfg = ExportConfig::default();
    let messages = tall_conversation(120);
    let tree = layout_transcript(&messages, cfg.canvas_width, &cfg.layout, &cfg.theme, &CellFace);
    // tall enough that a 2x raster would exceed the canvas side limit
    assert!(tree.height > 8192);

    let compositor = ExportCompositor::new(&cfg, Arc::new(SoftwareRasterizer::new(Arc::new(CellFace))));
    match compositor.export_transcript(Some(&tree), Some(&frames()), &messages).await {
        Err(Error::OverLength { current, max }) => {
            assert_eq!(current, 100 + 80 + tree.height + 60 + 120);
            assert_eq!(max, 2412);
        }
        other => panic!("expected OverLength, got {:?}", other.map(|c| c.map(|c| c.height()))),
    }
}

#[tokio::test]
async fn overlength_is_detected_before_rasterizing() {
    let cfg = ExportConfig::default();
    let messages = tall_conversation(40);
    let tree = layout_transcript(&messages, cfg.canvas_width, &cfg.layout, &cfg.theme, &CellFace);
    assert!(tree.height > 2412);

    let counting = Arc::new(Counting::default());
    let compositor = ExportCompositor::new(&cfg, counting.clone());
    let result = compositor.export_transcript(Some(&tree), Some(&frames()), &messages).await;
    assert!(matches!(result, Err(Error::OverLength { .. })));
    assert_eq!(counting.0.load(Ordering::SeqCst), 0);
}
