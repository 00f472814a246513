use std::{cell::RefCell, collections::BTreeMap, fmt::Write};

use kommand::{
    channel::CommandChannel,
    handler::{
        handler_fn, FileHandler, FileStore, HandlerChain, KommandHandler, PingHandler,
        ScreenCapture, ScreenshotHandler,
    },
    kommand::well_known::{
        FileChunk, FileError, FileErrorCode, Log, LogLevel, NmeaSentence, Ping, Pong,
    },
    mode::{ModeWatcher, SerialMode},
    typenum::U64,
    Kommand, KommandId, KommandReader, KommandWriter,
};

use crate::port::{frame, unframe, FakeSerial};


#[derive(Default)]
struct SdCard {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileStore for SdCard {
    fn read_at(
        &mut self,
        path: &str,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, FileErrorCode> {
        let file = self.files.get(path).ok_or(FileErrorCode::NotFound)?;
        let start = (offset as usize).min(file.len());
        let len = buf.len().min(file.len() - start);
        buf[..len].copy_from_slice(&file[start..start + len]);
        Ok(len)
    }

    fn write_at(
        &mut self,
        path: &str,
        offset: u32,
        data: &[u8],
    ) -> Result<usize, FileErrorCode> {
        let file = self.files.entry(path.to_owned()).or_default();
        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(data.len())
    }
}

struct Blank;

impl ScreenCapture for Blank {
    fn size(&self) -> (u16, u16) {
        (480, 272)
    }

    fn read_row(&mut self, _y: u16, pixels: &mut [u8]) {
        pixels.fill(0xff);
    }
}

fn kommand(id: KommandId, build: impl FnOnce(&mut KommandWriter<U64>)) -> Vec<u8> {
    let mut writer = KommandWriter::<U64>::new(id);
    build(&mut writer);
    frame(writer.bytes())
}

#[test]
fn gateway_session() {
    let host = FakeSerial::at_baud(921_600);
    let mut watcher = ModeWatcher::default();
    assert_eq!(watcher.poll(host.wire().baud), Some(SerialMode::Command));

    let mut channel = CommandChannel::<_>::new(host.clone());
    let mut ping = PingHandler;
    let mut files = FileHandler::new(SdCard::default());
    let mut screen = ScreenshotHandler::new(Blank);
    let sentences = RefCell::new(Vec::new());
    let mut nmea = handler_fn(|kommand, _| match NmeaSentence::decode(&kommand) {
        Ok(nmea) => {
            sentences.borrow_mut().push(nmea.sentence.to_owned());
            true
        }
        Err(_) => false,
    });

    host.send(&frame(Ping { echo_id: 0x1234_5678 }.to_writer().bytes()));
    host.send(&kommand(KommandId::FileWrite, |w| {
        w.append_u32(1);
        w.append_u32(0);
        w.append_u32(3);
        w.append_cstr("/routes/home.gpx");
        w.append_bytes(&[0xc0, 0xdb, 0x00]);
    }));
    host.send(&kommand(KommandId::FileRead, |w| {
        w.append_u32(2);
        w.append_u32(1);
        w.append_u32(100);
        w.append_cstr("/routes/home.gpx");
    }));
    host.send(&kommand(KommandId::FileRead, |w| {
        w.append_u32(3);
        w.append_u32(0);
        w.append_u32(100);
        w.append_cstr("/missing");
    }));
    host.send(&frame(
        NmeaSentence {
            sentence: "$GPRMC,,V,,,,,,,,,,N*53",
        }
        .to_writer()
        .bytes(),
    ));
    host.send(&kommand(KommandId::Screenshot, |w| {
        w.append_u16(270);
    }));
    host.send(&kommand(KommandId::WiFiStatus, |_| {}));

    let mut handlers: [&mut dyn KommandHandler; 4] =
        [&mut ping, &mut files, &mut screen, &mut nmea];
    let mut claimed = Vec::new();
    while let Some(result) = channel.poll(&mut handlers) {
        claimed.push(result);
    }
    assert_eq!(claimed, [true, true, true, true, true, true, false]);

    let replies = unframe(&host.received());
    assert_eq!(replies.len(), 6);

    assert_eq!(
        Pong::decode(&KommandReader::from(&replies[0][..])),
        Ok(Pong {
            echo_id: 0x1234_5678
        })
    );

    let mut write_reply = KommandReader::from(&replies[1][..]);
    assert_eq!(write_reply.kommand_id(), Some(KommandId::FileWriteReply));
    assert_eq!(
        FileChunk::read_from(&mut write_reply),
        Ok(FileChunk {
            request_id: 1,
            offset: 0,
            size: 3
        })
    );

    let mut read_reply = KommandReader::from(&replies[2][..]);
    assert_eq!(read_reply.kommand_id(), Some(KommandId::FileReadReply));
    assert_eq!(
        FileChunk::read_from(&mut read_reply),
        Ok(FileChunk {
            request_id: 2,
            offset: 1,
            size: 2
        })
    );
    assert_eq!(read_reply.rest(), &[0xdb, 0x00]);

    assert_eq!(
        FileError::decode(&KommandReader::from(&replies[3][..])),
        Ok(FileError {
            request_id: 3,
            code: FileErrorCode::NotFound
        })
    );

    // one 480 pixel row per 1 KiB reply
    let mut screenshot = KommandReader::from(&replies[4][..]);
    assert_eq!(screenshot.kommand_id(), Some(KommandId::ScreenshotData));
    assert_eq!(screenshot.read_u16(), 270);
    assert_eq!(screenshot.remaining(), 480 * 2);

    assert_eq!(replies[5], [0x0f, 0x00]);

    assert_eq!(*sentences.borrow(), ["$GPRMC,,V,,,,,,,,,,N*53"]);
}

#[test]
fn handler_chain_drives_channel() {
    let host = FakeSerial::at_baud(921_600);
    let mut channel = CommandChannel::<_>::new(host.clone());

    let pings = RefCell::new(0);
    let mut counter = handler_fn(|kommand, _| {
        if kommand.kommand_id() == Some(KommandId::Ping) {
            *pings.borrow_mut() += 1;
        }
        false
    });
    let mut ping = PingHandler;

    let mut chain = HandlerChain::<4>::new();
    assert!(chain.register(&mut counter).is_ok());
    assert!(chain.register(&mut ping).is_ok());

    host.send(&frame(Ping { echo_id: 1 }.to_writer().bytes()));
    host.send(&[0xc0, 0xc0]);
    host.send(&frame(Ping { echo_id: 2 }.to_writer().bytes()));

    // the chain is a handler list like any other
    let mut kommand_count = 0;
    while channel.transport().poll().is_some() {
        let (payload, mut reply) = channel.transport().split();
        let len = payload.len();
        chain.dispatch(&KommandReader::new(payload, len), &mut reply, true);
        channel.transport().take(&mut []);
        kommand_count += 1;
    }

    assert_eq!(kommand_count, 2);
    assert_eq!(*pings.borrow(), 2);
    assert_eq!(unframe(&host.received()).len(), 2);
}

#[test]
fn garbage_is_counted_and_skipped() {
    let host = FakeSerial::at_baud(921_600);
    let mut channel = CommandChannel::<_, 16>::new(host.clone());

    host.send(&[0x00, 0x00, 0xdb, 0x01, 0xc0]);
    host.send(&[0x42; 40]);
    host.send(&[0xc0]);
    host.send(&frame(Ping { echo_id: 9 }.to_writer().bytes()));

    let mut ping = PingHandler;
    assert_eq!(channel.poll(&mut [&mut ping]), Some(true));
    assert_eq!(channel.poll(&mut [&mut ping]), None);
    assert_eq!(channel.invalid_frames(), 2);

    let replies = unframe(&host.received());
    assert_eq!(replies, [Pong { echo_id: 9 }.to_writer().bytes()]);
}

#[test]
fn gateway_logs_to_host() {
    let host = FakeSerial::at_baud(115_200);
    let mut channel = CommandChannel::<_>::new(host.clone());

    channel.send_kommand(&Log {
        level: LogLevel::Warning,
        line: 88,
        filename: "nmea.rs",
        message: "checksum mismatch",
    });

    let mut text = KommandWriter::<U64>::new(KommandId::NmeaSentence);
    write!(text, "$GPGLL,{:.2},N", 4916.45).unwrap();
    text.append_u8(0);
    channel.send(&text);

    let replies = unframe(&host.received());
    assert_eq!(
        Log::decode(&KommandReader::from(&replies[0][..])),
        Ok(Log {
            level: LogLevel::Warning,
            line: 88,
            filename: "nmea.rs",
            message: "checksum mismatch",
        })
    );
    assert_eq!(
        NmeaSentence::decode(&KommandReader::from(&replies[1][..])),
        Ok(NmeaSentence {
            sentence: "$GPGLL,4916.45,N"
        })
    );
}
