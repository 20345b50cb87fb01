use crate::matrix::Matrix;
use crate::widgets::MainWidget;
use crate::Error;

/// Draws a frame for every update request and swaps it onto the matrix,
/// until the widget tree is shut down. Returns the number of frames shown.
pub fn run(main_widget: &MainWidget, matrix: &mut dyn Matrix) -> Result<u64, Error> {
    let mut offscreen = matrix.create_frame_canvas();
    let mut frames = 0u64;

    while main_widget.draw_frame(&mut offscreen) {
        offscreen = match matrix.swap_on_vsync(offscreen) {
            Ok(frame) => frame,
            Err(e) => {
                // let the producers go before bailing out
                main_widget.shutdown();
                return Err(e);
            }
        };
        frames += 1;
    }

    matrix.clear()?;
    Ok(frames)
}
