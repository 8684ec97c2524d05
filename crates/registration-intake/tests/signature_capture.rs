use registration_intake::capture::{
    CanvasRect, EventDisposition, IdCardPreview, PadEvent, Point, SignaturePad,
};

fn draw_stroke(pad: &mut SignaturePad) {
    pad.handle(PadEvent::MouseDown(Point::new(5.0, 5.0)));
    pad.handle(PadEvent::MouseMove(Point::new(60.0, 40.0)));
    pad.handle(PadEvent::MouseUp);
}

#[test]
fn fresh_pad_is_blank_and_stroke_marks_it() {
    let mut pad = SignaturePad::new(80, 50);
    assert!(pad.is_blank().expect("png encodes"));

    draw_stroke(&mut pad);
    assert!(!pad.is_blank().expect("png encodes"));
}

#[test]
fn clearing_restores_blank_and_is_idempotent() {
    let mut pad = SignaturePad::new(80, 50);
    draw_stroke(&mut pad);

    pad.clear();
    assert!(pad.is_blank().expect("png encodes"));
    pad.clear();
    assert!(pad.is_blank().expect("png encodes"));
}

#[test]
fn moves_without_press_leave_no_ink() {
    let mut pad = SignaturePad::new(80, 50);
    pad.handle(PadEvent::MouseMove(Point::new(10.0, 10.0)));
    pad.handle(PadEvent::MouseMove(Point::new(70.0, 40.0)));
    assert!(pad.is_blank().expect("png encodes"));

    pad.handle(PadEvent::MouseDown(Point::new(10.0, 10.0)));
    pad.handle(PadEvent::MouseLeave);
    pad.handle(PadEvent::MouseMove(Point::new(70.0, 40.0)));
    assert!(!pad.is_drawing());
    assert!(pad.is_blank().expect("png encodes"));
}

#[test]
fn touch_input_is_offset_by_canvas_bounds_and_blocks_scrolling() {
    let mut pad = SignaturePad::new(80, 50).with_bounds(CanvasRect {
        left: 100.0,
        top: 200.0,
    });

    assert_eq!(
        pad.handle(PadEvent::TouchStart(Point::new(110.0, 210.0))),
        EventDisposition::PreventDefault
    );
    assert_eq!(
        pad.handle(PadEvent::TouchMove(Point::new(150.0, 230.0))),
        EventDisposition::PreventDefault
    );
    assert_eq!(pad.handle(PadEvent::TouchEnd), EventDisposition::PreventDefault);

    let inked = pad.pixels().get_pixel(30, 20);
    assert_eq!(inked[3], 255);
    assert!(!pad.is_blank().expect("png encodes"));
}

#[test]
fn removing_id_card_hides_preview() {
    let mut preview = IdCardPreview::default();
    preview.select_file(registration_intake::capture::SelectedFile {
        filename: "id.png".to_string(),
        content_type: "image/png".to_string(),
        content: bytes::Bytes::from_static(b"png"),
    });
    assert!(preview.is_visible());
    assert!(preview
        .preview_src()
        .is_some_and(|src| src.starts_with("data:image/png;base64,")));

    preview.remove();
    assert!(!preview.is_visible());
    assert!(preview.file().is_none());
    assert!(preview.preview_src().is_none());
}
