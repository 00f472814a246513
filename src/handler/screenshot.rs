use generic_array::typenum::{U1024, U2};

use super::KommandHandler;
use crate::{
    kommand::{KommandReader, KommandWriter},
    serial::FrameSink,
    KommandId,
};

/// Read access to the display's frame buffer.
pub trait ScreenCapture {
    /// Width and height in pixels.
    fn size(&self) -> (u16, u16);

    /// Fill `pixels` with row `y` as `width` little-endian RGB565 values.
    fn read_row(&mut self, y: u16, pixels: &mut [u8]);
}

/// Answers `Screenshot(start_row)` with one `ScreenshotData(row, pixels)`
/// holding as many whole rows as fit in a reply, starting at `start_row`.
///
/// The host asks again from the first row it did not get. A request at or
/// past the last row is answered with no pixels, which ends the capture.
///
/// Replies are capped at 1 KiB like every other frame on the command
/// channel, which limits displays to 510 pixels per row. Wider displays get
/// an `Err` reply instead of a capture.
pub struct ScreenshotHandler<S> {
    screen: S,
}

impl<S: ScreenCapture> ScreenshotHandler<S> {
    pub fn new(screen: S) -> Self {
        Self { screen }
    }

    pub fn into_inner(self) -> S {
        self.screen
    }
}

impl<S: ScreenCapture> KommandHandler for ScreenshotHandler<S> {
    fn try_handle(&mut self, mut kommand: KommandReader<'_>, reply: &mut dyn FrameSink) -> bool {
        if kommand.kommand_id() != Some(KommandId::Screenshot) {
            return false;
        }

        let start_row = kommand.read_u16();
        let (width, height) = self.screen.size();
        let row_len = usize::from(width) * 2;

        let mut writer = KommandWriter::<U1024>::new(KommandId::ScreenshotData);
        writer.append_u16(start_row);

        if start_row < height && row_len > writer.remaining() {
            #[cfg(feature = "defmt")]
            defmt::warn!("screenshot: {} byte rows do not fit in a reply", row_len);

            KommandWriter::<U2>::new(KommandId::Err).send(reply);
            return true;
        }

        let mut row = start_row;
        while row < height {
            let Some(pixels) = writer.spare_mut(row_len) else {
                break;
            };
            self.screen.read_row(row, pixels);
            row += 1;
        }

        writer.send(reply);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{ScreenCapture, ScreenshotHandler};
    use crate::{
        handler::{testing::Frames, KommandHandler},
        kommand::KommandReader,
    };

    /// 160x4 display where every pixel holds its row number.
    struct Stripes;

    impl ScreenCapture for Stripes {
        fn size(&self) -> (u16, u16) {
            (160, 4)
        }

        fn read_row(&mut self, y: u16, pixels: &mut [u8]) {
            for px in pixels.chunks_exact_mut(2) {
                px.copy_from_slice(&y.to_le_bytes());
            }
        }
    }

    fn request<S: ScreenCapture>(
        handler: &mut ScreenshotHandler<S>,
        start_row: Option<u16>,
    ) -> Frames {
        let mut bytes = [0x30, 0x00, 0x00, 0x00];
        let len = match start_row {
            Some(row) => {
                bytes[2..].copy_from_slice(&row.to_le_bytes());
                4
            }
            None => 2,
        };

        let mut frames = Frames::default();
        assert!(handler.try_handle(KommandReader::new(&bytes, len), &mut frames));
        frames
    }

    #[test]
    fn sends_whole_rows_that_fit() {
        let mut handler = ScreenshotHandler::new(Stripes);
        let frames = request(&mut handler, None);
        let data = &frames.0[0];

        // 320 bytes per row, 1020 bytes of room
        assert_eq!(data.len(), 4 + 3 * 320);
        assert_eq!(&data[..4], &[0x31, 0x00, 0x00, 0x00]);
        assert_eq!(&data[4 + 320..4 + 322], &[0x01, 0x00]);
    }

    #[test]
    fn continues_from_start_row() {
        let mut handler = ScreenshotHandler::new(Stripes);
        let frames = request(&mut handler, Some(3));
        let data = &frames.0[0];

        assert_eq!(data.len(), 4 + 320);
        assert_eq!(&data[2..4], &[0x03, 0x00]);
        assert_eq!(&data[4..6], &[0x03, 0x00]);
    }

    #[test]
    fn past_the_end_has_no_pixels() {
        let mut handler = ScreenshotHandler::new(Stripes);
        let frames = request(&mut handler, Some(4));

        assert_eq!(frames.0, [[0x31, 0x00, 0x04, 0x00]]);
    }

    /// 600 pixels per row, more than any reply can carry.
    struct Wide;

    impl ScreenCapture for Wide {
        fn size(&self) -> (u16, u16) {
            (600, 8)
        }

        fn read_row(&mut self, _y: u16, pixels: &mut [u8]) {
            pixels.fill(0xff);
        }
    }

    #[test]
    fn rows_too_wide_for_a_reply_are_refused() {
        let mut handler = ScreenshotHandler::new(Wide);

        let frames = request(&mut handler, Some(0));
        assert_eq!(frames.0, [[0x0f, 0x00]]);

        // the end of the capture still looks like one
        let frames = request(&mut handler, Some(8));
        assert_eq!(frames.0, [[0x31, 0x00, 0x08, 0x00]]);
    }
}
