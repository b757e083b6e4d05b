use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;
use crate::genome::{Genome, Piece};
use crate::index::GenomeIndex;

const GENOME_FILE: &str = "Genome";
const SEED_TABLE_FILE: &str = "SeedTable";
const SEED_TABLE_MAGIC: u32 = 0x534e_5052; // "SNPR"

impl GenomeIndex {
    /// Write the index (genome + seed table) to a directory.
    pub fn write(&self, dir: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))?;

        let genome_path = dir.join(GENOME_FILE);
        let mut w = BufWriter::new(
            File::create(&genome_path).map_err(|e| Error::io(e, &genome_path))?,
        );
        write_genome(&mut w, self.genome()).map_err(|e| Error::io(e, &genome_path))?;
        w.flush().map_err(|e| Error::io(e, &genome_path))?;

        let table_path = dir.join(SEED_TABLE_FILE);
        let mut w =
            BufWriter::new(File::create(&table_path).map_err(|e| Error::io(e, &table_path))?);
        write_seed_table(&mut w, self).map_err(|e| Error::io(e, &table_path))?;
        w.flush().map_err(|e| Error::io(e, &table_path))?;

        Ok(())
    }

    /// Load an index previously written with [`GenomeIndex::write`].
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let genome_path = dir.join(GENOME_FILE);
        let mut r =
            BufReader::new(File::open(&genome_path).map_err(|e| Error::io(e, &genome_path))?);
        let genome = read_genome(&mut r).map_err(|e| Error::io(e, &genome_path))?;

        let table_path = dir.join(SEED_TABLE_FILE);
        let mut r =
            BufReader::new(File::open(&table_path).map_err(|e| Error::io(e, &table_path))?);
        let (seed_len, table) = read_seed_table(&mut r, &table_path)?;

        log::info!(
            "Loaded index from {}: {} bases, seed length {}, {} distinct seeds",
            dir.display(),
            genome.count_of_bases(),
            seed_len,
            table.len()
        );

        Ok(GenomeIndex {
            genome,
            seed_len,
            table,
        })
    }
}

fn write_genome<W: Write>(w: &mut W, genome: &Genome) -> std::io::Result<()> {
    w.write_u32::<LittleEndian>(genome.pieces().len() as u32)?;
    for piece in genome.pieces() {
        w.write_u32::<LittleEndian>(piece.name.len() as u32)?;
        w.write_all(piece.name.as_bytes())?;
        w.write_u32::<LittleEndian>(piece.beginning_offset)?;
    }
    w.write_u32::<LittleEndian>(genome.count_of_bases())?;
    w.write_all(genome.bases())?;
    Ok(())
}

fn read_genome<R: Read>(r: &mut R) -> std::io::Result<Genome> {
    let n_pieces = r.read_u32::<LittleEndian>()?;
    let mut pieces = Vec::with_capacity(n_pieces as usize);
    for _ in 0..n_pieces {
        let name_len = r.read_u32::<LittleEndian>()?;
        let mut name_bytes = vec![0u8; name_len as usize];
        r.read_exact(&mut name_bytes)?;
        let name = String::from_utf8(name_bytes).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, format!("piece name: {e}"))
        })?;
        let beginning_offset = r.read_u32::<LittleEndian>()?;
        pieces.push(Piece {
            name,
            beginning_offset,
        });
    }
    let n_bases = r.read_u32::<LittleEndian>()?;
    let mut bases = vec![0u8; n_bases as usize];
    r.read_exact(&mut bases)?;
    Ok(Genome::from_parts(bases, pieces))
}

fn write_seed_table<W: Write>(w: &mut W, index: &GenomeIndex) -> std::io::Result<()> {
    w.write_u32::<LittleEndian>(SEED_TABLE_MAGIC)?;
    w.write_u32::<LittleEndian>(index.seed_len)?;
    w.write_u64::<LittleEndian>(index.table.len() as u64)?;
    for (&key, hits) in &index.table {
        w.write_u64::<LittleEndian>(key)?;
        w.write_u32::<LittleEndian>(hits.len() as u32)?;
        for &hit in hits {
            w.write_u32::<LittleEndian>(hit)?;
        }
    }
    Ok(())
}

fn read_seed_table<R: Read>(
    r: &mut R,
    path: &Path,
) -> Result<(u32, HashMap<u64, Vec<u32>>), Error> {
    let magic = r
        .read_u32::<LittleEndian>()
        .map_err(|e| Error::io(e, path))?;
    if magic != SEED_TABLE_MAGIC {
        return Err(Error::Index(format!(
            "{} is not a ruSNAP seed table (bad magic)",
            path.display()
        )));
    }
    let seed_len = r
        .read_u32::<LittleEndian>()
        .map_err(|e| Error::io(e, path))?;
    let n_entries = r
        .read_u64::<LittleEndian>()
        .map_err(|e| Error::io(e, path))?;

    let mut table = HashMap::with_capacity(n_entries as usize);
    for _ in 0..n_entries {
        let key = r.read_u64::<LittleEndian>().map_err(|e| Error::io(e, path))?;
        let n_hits = r
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::io(e, path))?;
        let mut hits = Vec::with_capacity(n_hits as usize);
        for _ in 0..n_hits {
            hits.push(r.read_u32::<LittleEndian>().map_err(|e| Error::io(e, path))?);
        }
        table.insert(key, hits);
    }

    Ok((seed_len, table))
}
