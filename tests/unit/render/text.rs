use super::*;

fn style(size: f32, min: f32) -> TextStyle {
    TextStyle::new(size, Rgba8::WHITE)
        .with_min_size(min)
        .with_step(2.0)
}

#[test]
fn greedy_wrap_on_word_boundaries() {
    let r = TextRenderer::builtin();
    let lines = r.wrap("aaa bbb ccc", 8.0, 34.0).unwrap();
    assert_eq!(lines, ["aaa", "bbb", "ccc"]);
    let lines = r.wrap("aaa bbb ccc", 8.0, 35.0).unwrap();
    assert_eq!(lines, ["aaa bbb", "ccc"]);
}

#[test]
fn words_wider_than_box_break_by_char() {
    let r = TextRenderer::builtin();
    let lines = r.wrap("abcdefghij xy", 8.0, 25.0).unwrap();
    assert_eq!(lines, ["abcde", "fghij", "xy"]);
}

#[test]
fn explicit_newlines_start_new_lines() {
    let r = TextRenderer::builtin();
    let lines = r.wrap("one\ntwo", 10.0, 1000.0).unwrap();
    assert_eq!(lines, ["one", "two"]);
}

#[test]
fn shrinks_before_truncating() {
    let r = TextRenderer::builtin();
    let target = PixelBox::new(0, 0, 120, 30);
    let block = r.fit("Hello big world", target, &style(20.0, 8.0)).unwrap();
    assert!(!block.truncated);
    assert_eq!(block.font_size, 12.0);
    assert_eq!(block.lines, ["Hello big world"]);
    assert!(target.contains(block.bounds));
}

#[test]
fn ellipsis_only_at_minimum_size() {
    let r = TextRenderer::builtin();
    let target = PixelBox::new(5, 5, 60, 20);
    let long = "An unreasonably long headline that keeps going well past any channel limit";
    let block = r.fit(long, target, &style(16.0, 10.0)).unwrap();
    assert!(block.truncated);
    assert_eq!(block.font_size, 10.0);
    assert_eq!(block.lines.len(), 1);
    assert!(block.lines[0].ends_with('\u{2026}'));
    assert!(target.contains(block.bounds));
}

#[test]
fn overlong_input_never_escapes_the_box() {
    let r = TextRenderer::builtin();
    let text = "W".repeat(500);
    for (w, h) in [(10, 10), (200, 15), (37, 300), (1, 1)] {
        let target = PixelBox::new(3, 4, w, h);
        let block = r.fit(&text, target, &style(40.0, 12.0)).unwrap();
        assert!(target.contains(block.bounds), "{block:?} not in {target:?}");
    }
}

#[test]
fn empty_text_or_box_yields_empty_block() {
    let r = TextRenderer::builtin();
    assert!(r.fit("   ", PixelBox::new(0, 0, 50, 50), &style(12.0, 8.0)).unwrap().is_empty());
    assert!(r.fit("hi", PixelBox::new(0, 0, 0, 50), &style(12.0, 8.0)).unwrap().is_empty());
}

#[test]
fn alignment_positions_block_inside_target() {
    let r = TextRenderer::builtin();
    let target = PixelBox::new(0, 0, 100, 50);
    let s = style(10.0, 8.0)
        .with_align(TextAlign::Right)
        .with_valign(VerticalAlign::Center);
    let block = r.fit("abc", target, &s).unwrap();
    assert_eq!(block.bounds.right(), 100);
    assert_eq!(block.bounds.width, 19);
    assert_eq!(block.bounds.y, (50 - 13) / 2);
}

#[test]
fn draw_touches_only_the_target_box() {
    let r = TextRenderer::builtin();
    let mut canvas = Raster::transparent(100, 50);
    let target = PixelBox::new(10, 10, 80, 30);
    let block = r.draw(&mut canvas, "Hi", target, &style(20.0, 8.0)).unwrap();
    assert_eq!(block.lines, ["Hi"]);
    assert_eq!(canvas.pixel(15, 20)[3], 255);
    for y in 0..50 {
        for x in 0..100 {
            let inside = target.contains(PixelBox::new(x, y, 1, 1));
            if !inside {
                assert_eq!(canvas.pixel(x, y)[3], 0, "pixel ({x},{y}) drawn outside");
            }
        }
    }
}
