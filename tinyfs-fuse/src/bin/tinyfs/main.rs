mod cli;

use std::fs;
use std::io::{self, Write};

use clap::Parser;
use tinyfs::{Descriptor, DescriptorKind, TinyFs};
use tinyfs_fuse::into_io;

use self::cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Command::Format { descriptors } = cli.command {
        let fs = tinyfs_fuse::format(&cli.image, descriptors)?;
        let statfs = fs.statfs().map_err(into_io)?;
        println!(
            "{}: {} descriptors, {} blocks of {} bytes",
            cli.image.display(),
            statfs.descriptors,
            statfs.blocks,
            statfs.block_size
        );
        return Ok(());
    }

    let mut fs = tinyfs_fuse::mount(&cli.image)?;
    run(&mut fs, cli.command).map_err(into_io)
}

fn run(fs: &mut TinyFs, command: Command) -> tinyfs::Result<()> {
    match command {
        Command::Format { .. } => unreachable!("handled before mounting"),
        Command::Ls { dir } => {
            for entry in fs.list(&dir)? {
                let descriptor = fs.stat(entry.descriptor_id())?;
                println!("{}", describe(&descriptor, entry.name()));
            }
        }
        Command::Put { source, name } => {
            let data = fs::read(&source).map_err(|err| {
                log::error!("{}: {err}", source.display());
                tinyfs::Error::Io
            })?;
            let size = u16::try_from(data.len()).map_err(|_| tinyfs::Error::OutOfRange)?;

            if fs.lookup(&name).is_err() {
                fs.create_file(&name)?;
            }
            fs.truncate(&name, size)?;
            let fd = fs.open(&name)?;
            fs.write(fd, 0, &data)?;
            fs.close(fd)?;
            log::info!("put {} -> {name:?} ({size} bytes)", source.display());
        }
        Command::Cat { name } => {
            let fd = fs.open(&name)?;
            let size = fs.fstat(fd)?.size as usize;
            let data = fs.read(fd, 0, size)?;
            fs.close(fd)?;
            io::stdout().write_all(&data).map_err(|_| tinyfs::Error::Io)?;
        }
        Command::Truncate { name, size } => {
            fs.truncate(&name, size)?;
        }
        Command::Link { existing, new } => fs.link(&existing, &new)?,
        Command::Unlink { name } => fs.unlink(&name)?,
        Command::Mkdir { path } => {
            fs.make_directory(&path)?;
        }
        Command::Rmdir { path } => fs.remove_directory(&path)?,
        Command::Stat { name } => {
            let descriptor = fs.stat(fs.lookup(&name)?)?;
            println!("{descriptor:#?}");
        }
        Command::Df => {
            let statfs = fs.statfs()?;
            println!(
                "blocks: {}/{} free, descriptors: {}/{} free, image: {} bytes",
                statfs.free_blocks,
                statfs.blocks,
                statfs.free_descriptors,
                statfs.descriptors,
                statfs.image_len
            );
        }
    }

    Ok(())
}

fn describe(descriptor: &Descriptor, name: &str) -> String {
    let kind = match descriptor.kind {
        DescriptorKind::Directory => 'd',
        DescriptorKind::Symlink => 'l',
        _ => '-',
    };
    format!(
        "{kind} {:>5} {:>3} {:>6} {name}",
        descriptor.id, descriptor.refcount, descriptor.size
    )
}
